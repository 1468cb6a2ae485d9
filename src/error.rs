use crate::sql::SqlText;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Query execution error: {message}")]
    QueryExecution { message: String, sql: SqlText },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssistantError {
    pub fn execution(message: impl Into<String>, sql: &SqlText) -> Self {
        AssistantError::QueryExecution {
            message: message.into(),
            sql: sql.clone(),
        }
    }

    /// SQL that was being run when the error happened, if any.
    pub fn attempted_sql(&self) -> Option<&SqlText> {
        match self {
            AssistantError::QueryExecution { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
