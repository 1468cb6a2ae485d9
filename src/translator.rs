//! SQL Translator
//!
//! Builds a schema-grounded prompt from the user's question and asks the model
//! for a single SQLite statement. The reply is trimmed and wrapped in
//! [`SqlText`]; it is not parsed or checked here.

use crate::error::{AssistantError, Result};
use crate::llm::TextGenerator;
use crate::schema;
use crate::sql::SqlText;
use std::sync::Arc;
use tracing::{debug, info};

const TRANSLATOR_ROLE: &str =
    "You are an expert in converting English questions to SQL queries for a healthcare database.";

const GUIDELINES: &[&str] = &[
    "Use proper SQL syntax for SQLite.",
    "Use WHERE, GROUP BY, ORDER BY as needed.",
    "Use COUNT, DISTINCT, and date functions if asked.",
    "Join tables on Id (the primary key in both tables).",
    "An Id may exist in only one of the tables. When looking up a single Id across both tables, use UNION ALL of both tables with NULL for the columns the other table lacks, as in the last example.",
    "HIS_LOGS.CardNumber is text with leading zeros; cast before comparing it with DIAGNOSIS.CardNumber.",
    "Use LIKE for partial text matches if the question asks for \"containing\" or \"includes\".",
    "Return only the SQL query, no explanations or markdown.",
];

/// Previous failed attempt, fed back when the repair loop retries.
#[derive(Debug, Clone)]
pub struct RecoveryHint {
    pub failed_sql: SqlText,
    pub error: String,
    pub guidance: String,
}

#[derive(Clone)]
pub struct SqlTranslator {
    generator: Arc<dyn TextGenerator>,
}

impl SqlTranslator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Translate a question into a single SQL statement.
    pub async fn translate(&self, question: &str) -> Result<SqlText> {
        self.translate_with_hint(question, None).await
    }

    /// Translate, optionally telling the model what went wrong last time.
    pub async fn translate_with_hint(
        &self,
        question: &str,
        hint: Option<&RecoveryHint>,
    ) -> Result<SqlText> {
        let prompt = build_prompt(question, hint);
        debug!(prompt_chars = prompt.len(), retry = hint.is_some(), "translating question");

        let response = self.generator.generate(&prompt).await?;
        let sql = SqlText::new(&response)
            .ok_or_else(|| AssistantError::Generation("Model returned an empty SQL statement".to_string()))?;

        info!("Generated SQL: {}", sql);
        Ok(sql)
    }
}

/// Full translator prompt: role, schema, guidelines, worked examples, question.
pub fn build_prompt(question: &str, hint: Option<&RecoveryHint>) -> String {
    let mut parts = Vec::new();

    parts.push(TRANSLATOR_ROLE.to_string());
    parts.push(schema::describe());

    let guidelines: Vec<String> = GUIDELINES
        .iter()
        .enumerate()
        .map(|(i, g)| format!("{}. {}", i + 1, g))
        .collect();
    parts.push(format!("Guidelines:\n{}", guidelines.join("\n")));

    let examples: Vec<String> = schema::worked_examples()
        .iter()
        .map(|e| format!("- Question: {}\n  SQL: {}", e.question, e.sql))
        .collect();
    parts.push(format!("Examples:\n{}", examples.join("\n\n")));

    if let Some(hint) = hint {
        parts.push(format!(
            "A previous attempt for this question failed.\nFailed SQL: {}\nError: {}\nHint: {}\nWrite a corrected query.",
            hint.failed_sql, hint.error, hint.guidance
        ));
    }

    parts.push(format!("Question: {}\nSQL:", question));
    parts.join("\n\n")
}
