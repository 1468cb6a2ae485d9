//! Schema Contract
//!
//! Fixed description of the two tables the assistant can query. Prompt
//! construction for both the translator and the summarizer renders from here,
//! so the model always sees the same column list.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnSchema {
    pub name: &'static str,
    pub column_type: ColumnType,
    /// Extra detail appended after the type, e.g. the date format.
    pub format: Option<&'static str>,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [ColumnSchema],
}

impl TableSchema {
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|c| c.name)
    }

    /// Prompt rendering: `Table: NAME` followed by one bullet per column.
    pub fn describe(&self) -> String {
        let mut lines = vec![format!("Table: {}", self.name)];
        for column in self.columns {
            let kind = match column.format {
                Some(format) => format!("{}, format: {}", column.column_type.as_sql(), format),
                None => column.column_type.as_sql().to_string(),
            };
            lines.push(format!("- {} ({}): {}", column.name, kind, column.description));
        }
        lines.join("\n")
    }
}

pub const DATE_FORMAT: &str = "DD/MM/YYYY HH:MM";

pub const DIAGNOSIS: TableSchema = TableSchema {
    name: "DIAGNOSIS",
    columns: &[
        ColumnSchema {
            name: "Id",
            column_type: ColumnType::Integer,
            format: None,
            description: "Primary key. Unique identifier for each diagnosis event.",
        },
        ColumnSchema {
            name: "CardNumber",
            column_type: ColumnType::Integer,
            format: None,
            description: "Patient's card number.",
        },
        ColumnSchema {
            name: "DiagnosisDate",
            column_type: ColumnType::Text,
            format: Some(DATE_FORMAT),
            description: "Date and time of diagnosis.",
        },
        ColumnSchema {
            name: "Diagnosis",
            column_type: ColumnType::Text,
            format: None,
            description: "Diagnosis description.",
        },
    ],
};

pub const HIS_LOGS: TableSchema = TableSchema {
    name: "HIS_LOGS",
    columns: &[
        ColumnSchema {
            name: "Id",
            column_type: ColumnType::Integer,
            format: None,
            description: "Primary key. Unique identifier for each log event.",
        },
        ColumnSchema {
            name: "RefType",
            column_type: ColumnType::Text,
            format: None,
            description: "Reference type (e.g., type of event).",
        },
        ColumnSchema {
            name: "DoctorId",
            column_type: ColumnType::Integer,
            format: None,
            description: "Doctor's ID.",
        },
        ColumnSchema {
            name: "RefDateTime",
            column_type: ColumnType::Text,
            format: Some(DATE_FORMAT),
            description: "Date and time of the event.",
        },
        ColumnSchema {
            name: "LocationName",
            column_type: ColumnType::Text,
            format: None,
            description: "Name of the location.",
        },
        ColumnSchema {
            name: "LocationAreaName",
            column_type: ColumnType::Text,
            format: None,
            description: "Area within the location.",
        },
        ColumnSchema {
            name: "CardNumber",
            column_type: ColumnType::Text,
            format: None,
            description: "Patient's card number (may have leading zeros, not directly comparable to DIAGNOSIS.CardNumber).",
        },
    ],
};

pub const TABLES: [TableSchema; 2] = [DIAGNOSIS, HIS_LOGS];

/// Both tables rendered for a prompt.
pub fn describe() -> String {
    let tables: Vec<String> = TABLES.iter().map(TableSchema::describe).collect();
    format!("The database has two tables:\n\n{}", tables.join("\n\n"))
}

/// A question paired with the SQL the model is expected to produce for it.
#[derive(Debug, Clone, Serialize)]
pub struct WorkedExample {
    pub question: String,
    pub sql: String,
}

impl WorkedExample {
    fn new(question: &str, sql: impl Into<String>) -> Self {
        Self {
            question: question.to_string(),
            sql: sql.into(),
        }
    }
}

/// Few-shot examples shown to the translator. They pin the dialect and the
/// `UNION ALL` fallback for single-id lookups.
pub fn worked_examples() -> Vec<WorkedExample> {
    vec![
        WorkedExample::new("How many diagnoses are there?", "SELECT COUNT(*) FROM DIAGNOSIS;"),
        WorkedExample::new("List all unique diagnoses.", "SELECT DISTINCT Diagnosis FROM DIAGNOSIS;"),
        WorkedExample::new("Show all diagnoses for Id 10.", "SELECT * FROM DIAGNOSIS WHERE Id = 10;"),
        WorkedExample::new(
            "Which diagnoses include the word fracture?",
            "SELECT Diagnosis, COUNT(*) AS Occurrences FROM DIAGNOSIS WHERE Diagnosis LIKE '%fracture%' GROUP BY Diagnosis;",
        ),
        WorkedExample::new(
            "For each Id, show the diagnosis and the corresponding log event type.",
            "SELECT d.Id, d.Diagnosis, h.RefType FROM DIAGNOSIS d JOIN HIS_LOGS h ON d.Id = h.Id;",
        ),
        WorkedExample::new("Show everything recorded for Id 42.", id_lookup_sql(42)),
    ]
}

/// Looks up one `Id` across both tables.
///
/// Each table contributes its own branch with the other table's columns padded
/// with NULL, so an id that exists in only one table still yields that row and
/// an id that exists in neither yields no rows.
pub fn id_lookup_sql(id: i64) -> String {
    let diagnosis_branch = format!(
        "SELECT 'DIAGNOSIS' AS source, d.Id, d.CardNumber, d.DiagnosisDate, d.Diagnosis, \
         NULL AS RefType, NULL AS DoctorId, NULL AS RefDateTime, NULL AS LocationName, NULL AS LocationAreaName \
         FROM DIAGNOSIS d WHERE d.Id = {id}"
    );
    let his_branch = format!(
        "SELECT 'HIS_LOGS' AS source, h.Id, h.CardNumber, NULL AS DiagnosisDate, NULL AS Diagnosis, \
         h.RefType, h.DoctorId, h.RefDateTime, h.LocationName, h.LocationAreaName \
         FROM HIS_LOGS h WHERE h.Id = {id}"
    );
    format!("{diagnosis_branch} UNION ALL {his_branch};")
}
