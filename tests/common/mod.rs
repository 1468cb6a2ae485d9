#![allow(dead_code)]

use async_trait::async_trait;
use healthdb_assistant::enrichment::DefinitionSource;
use healthdb_assistant::llm::TextGenerator;
use healthdb_assistant::{AssistantError, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Answers translation prompts with scripted SQL (repeating the last entry)
/// and summarization prompts with a fixed answer.
pub struct StubGenerator {
    sql_replies: Vec<String>,
    answer: String,
    sql_calls: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn new(sql: &str, answer: &str) -> Self {
        Self::scripted(&[sql], answer)
    }

    pub fn scripted(sql_replies: &[&str], answer: &str) -> Self {
        Self {
            sql_replies: sql_replies.iter().map(|s| s.to_string()).collect(),
            answer: answer.to_string(),
            sql_calls: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn summary_prompts(&self) -> Vec<String> {
        self.prompts().into_iter().filter(|p| is_summary_prompt(p)).collect()
    }
}

fn is_summary_prompt(prompt: &str) -> bool {
    prompt.contains("SQL Query Used:")
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if is_summary_prompt(prompt) {
            return Ok(format!("  {}\n", self.answer));
        }
        let mut calls = self.sql_calls.lock().unwrap();
        let index = (*calls).min(self.sql_replies.len() - 1);
        *calls += 1;
        Ok(format!("\n{}\n", self.sql_replies[index]))
    }
}

/// Generation service that is always down.
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(AssistantError::Generation("LLM API call failed: connection refused".to_string()))
    }
}

pub struct NoDefinitions;

#[async_trait]
impl DefinitionSource for NoDefinitions {
    async fn summary(&self, _term: &str) -> Option<String> {
        None
    }
}

pub struct FixedDefinitions(pub &'static str);

#[async_trait]
impl DefinitionSource for FixedDefinitions {
    async fn summary(&self, _term: &str) -> Option<String> {
        Some(self.0.to_string())
    }
}

/// Temporary `health.db` with both tables.
///
/// Ids 1-5 are in DIAGNOSIS, ids 3-6 in HIS_LOGS: 1 and 2 exist only in
/// DIAGNOSIS, 6 only in HIS_LOGS.
pub struct Fixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    pub fn seeded() -> Self {
        let fixture = Self::empty();
        let conn = Connection::open(&fixture.path).unwrap();
        conn.execute_batch(
            "INSERT INTO DIAGNOSIS VALUES
                (1, 1001, '02/01/2024 08:30', 'Asthma'),
                (2, 1002, '05/01/2024 10:00', 'Hypertension'),
                (3, 1003, '09/01/2024 14:45', 'Asthma'),
                (4, 1004, '11/01/2024 09:15', 'Type 2 diabetes'),
                (5, 1001, '20/01/2024 16:20', 'Migraine');
             INSERT INTO HIS_LOGS VALUES
                (3, 'Admission', 17, '09/01/2024 14:00', 'General Hospital', 'Ward A', '0001003'),
                (4, 'Consultation', 21, '11/01/2024 09:00', 'City Clinic', 'Room 2', '0001004'),
                (5, 'Consultation', 17, '20/01/2024 16:00', 'General Hospital', 'Ward B', '0001001'),
                (6, 'Discharge', 21, '21/01/2024 11:00', 'City Clinic', 'Front Desk', '0001006');",
        )
        .unwrap();
        fixture
    }

    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("health.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE DIAGNOSIS (Id INTEGER PRIMARY KEY, CardNumber INTEGER, DiagnosisDate TEXT, Diagnosis TEXT);
             CREATE TABLE HIS_LOGS (Id INTEGER PRIMARY KEY, RefType TEXT, DoctorId INTEGER, RefDateTime TEXT,
                                    LocationName TEXT, LocationAreaName TEXT, CardNumber TEXT);",
        )
        .unwrap();
        Self { _dir: dir, path }
    }
}
