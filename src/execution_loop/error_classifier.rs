//! Error Classifier
//!
//! Classifies execution errors into a small taxonomy used to decide whether a
//! retry is worth it and what to tell the translator on the next attempt.

use crate::error::AssistantError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlErrorClass {
    SyntaxError,
    ColumnNotFound,
    TableNotFound,
    AmbiguousColumn,
    ReadOnlyViolation,
    StoreUnavailable,
    GenerationFailure,
    ExecutionError(String),
}

impl SqlErrorClass {
    /// Whether re-translating could plausibly fix this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SqlErrorClass::StoreUnavailable | SqlErrorClass::GenerationFailure)
    }

    /// Hint passed back to the translator on retry.
    pub fn guidance(&self) -> &'static str {
        match self {
            SqlErrorClass::SyntaxError => "The statement was not valid SQLite. Return one well-formed SELECT statement.",
            SqlErrorClass::ColumnNotFound => "Use only the columns listed for each table, spelled exactly as shown.",
            SqlErrorClass::TableNotFound => "Only the DIAGNOSIS and HIS_LOGS tables exist.",
            SqlErrorClass::AmbiguousColumn => "Qualify columns that exist in both tables with a table alias, e.g. d.Id or h.Id.",
            SqlErrorClass::ReadOnlyViolation => "The database is read-only. Return a SELECT statement.",
            SqlErrorClass::StoreUnavailable | SqlErrorClass::GenerationFailure => "",
            SqlErrorClass::ExecutionError(_) => "Rewrite the query so it runs on SQLite against the tables above.",
        }
    }
}

impl fmt::Display for SqlErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlErrorClass::SyntaxError => write!(f, "SyntaxError"),
            SqlErrorClass::ColumnNotFound => write!(f, "ColumnNotFound"),
            SqlErrorClass::TableNotFound => write!(f, "TableNotFound"),
            SqlErrorClass::AmbiguousColumn => write!(f, "AmbiguousColumn"),
            SqlErrorClass::ReadOnlyViolation => write!(f, "ReadOnlyViolation"),
            SqlErrorClass::StoreUnavailable => write!(f, "StoreUnavailable"),
            SqlErrorClass::GenerationFailure => write!(f, "GenerationFailure"),
            SqlErrorClass::ExecutionError(msg) => write!(f, "ExecutionError({})", msg),
        }
    }
}

/// Error classifier
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify an error into the taxonomy
    pub fn classify(&self, error: &AssistantError) -> SqlErrorClass {
        let message = match error {
            AssistantError::QueryExecution { message, .. } => message.to_lowercase(),
            AssistantError::Generation(_) => return SqlErrorClass::GenerationFailure,
            other => return SqlErrorClass::ExecutionError(other.to_string()),
        };

        if message.contains("syntax error")
            || message.contains("incomplete input")
            || message.contains("no sql statement found")
            || message.contains("only one sql statement")
        {
            return SqlErrorClass::SyntaxError;
        }

        if message.contains("no such column") {
            return SqlErrorClass::ColumnNotFound;
        }

        if message.contains("no such table") {
            return SqlErrorClass::TableNotFound;
        }

        if message.contains("ambiguous column") {
            return SqlErrorClass::AmbiguousColumn;
        }

        if message.contains("read-only") || message.contains("readonly") {
            return SqlErrorClass::ReadOnlyViolation;
        }

        if message.contains("failed to open database") || message.contains("unable to open") {
            return SqlErrorClass::StoreUnavailable;
        }

        SqlErrorClass::ExecutionError(message)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqlText;

    fn execution(message: &str) -> AssistantError {
        AssistantError::execution(message, &SqlText::new("SELECT 1").unwrap())
    }

    #[test]
    fn test_classify_syntax_error() {
        let classifier = ErrorClassifier::new();
        let class = classifier.classify(&execution("near \"SELEKT\": syntax error"));
        assert_eq!(class, SqlErrorClass::SyntaxError);
        assert!(class.is_retryable());
    }

    #[test]
    fn test_statement_count_errors_are_syntax_errors() {
        let classifier = ErrorClassifier::new();
        for message in [
            "no SQL statement found",
            "only one SQL statement can be executed at a time",
        ] {
            assert_eq!(classifier.classify(&execution(message)), SqlErrorClass::SyntaxError);
        }
    }

    #[test]
    fn test_classify_column_not_found() {
        let classifier = ErrorClassifier::new();
        assert_eq!(
            classifier.classify(&execution("no such column: PatientName")),
            SqlErrorClass::ColumnNotFound
        );
    }

    #[test]
    fn test_classify_ambiguous_column() {
        let classifier = ErrorClassifier::new();
        assert_eq!(
            classifier.classify(&execution("ambiguous column name: Id")),
            SqlErrorClass::AmbiguousColumn
        );
    }

    #[test]
    fn test_store_and_generation_failures_are_not_retryable() {
        let classifier = ErrorClassifier::new();
        let store = classifier.classify(&execution("failed to open database health.db: unable to open database file"));
        assert_eq!(store, SqlErrorClass::StoreUnavailable);
        assert!(!store.is_retryable());

        let generation = classifier.classify(&AssistantError::Generation("timeout".to_string()));
        assert!(!generation.is_retryable());
    }
}
