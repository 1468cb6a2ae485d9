//! Execution Loop
//!
//! Translate then execute, with an explicit attempt cap. Execution errors are
//! fed back to the translator only while attempts remain; generation errors
//! and unreachable stores end the loop immediately.

use crate::error::AssistantError;
use crate::execution_loop::error_classifier::{ErrorClassifier, SqlErrorClass};
use crate::executor::QueryExecutor;
use crate::result::ResultSet;
use crate::sql::SqlText;
use crate::translator::{RecoveryHint, SqlTranslator};
use tracing::{info, warn};

/// Successful translate + execute.
#[derive(Debug, Clone)]
pub struct Execution {
    pub sql: SqlText,
    pub result: ResultSet,
    pub attempts: u8,
}

/// Final failure of the loop, with the last SQL that was attempted (if any).
#[derive(Debug)]
pub struct LoopFailure {
    pub error: AssistantError,
    pub attempted_sql: Option<SqlText>,
    pub attempts: u8,
}

/// Execution loop with bounded retries
pub struct ExecutionLoop {
    max_attempts: u8,
    abort_on_repeat_error: bool,
    error_classifier: ErrorClassifier,
}

impl ExecutionLoop {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u8, abort_on_repeat_error: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            abort_on_repeat_error,
            error_classifier: ErrorClassifier::new(),
        }
    }

    /// A single attempt, no feedback to the translator.
    pub fn single_attempt() -> Self {
        Self::new(1, true)
    }

    pub async fn execute_with_retry(
        &self,
        question: &str,
        translator: &SqlTranslator,
        executor: &QueryExecutor,
    ) -> Result<Execution, LoopFailure> {
        let mut previous_error: Option<SqlErrorClass> = None;
        let mut hint: Option<RecoveryHint> = None;
        let mut last_sql: Option<SqlText> = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                info!("Execution attempt {} of {}", attempt, self.max_attempts);
            }

            let sql = match translator.translate_with_hint(question, hint.as_ref()).await {
                Ok(sql) => sql,
                Err(error) => {
                    return Err(LoopFailure {
                        error,
                        attempted_sql: last_sql,
                        attempts: attempt,
                    })
                }
            };

            let error = match executor.execute(&sql).await {
                Ok(result) => {
                    if attempt > 1 {
                        info!("✅ Execution succeeded on attempt {}", attempt);
                    }
                    return Ok(Execution {
                        sql,
                        result,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            let error_class = self.error_classifier.classify(&error);
            if attempt == self.max_attempts
                || !error_class.is_retryable()
                || self.should_abort(&error_class, &previous_error)
            {
                return Err(LoopFailure {
                    error,
                    attempted_sql: Some(sql),
                    attempts: attempt,
                });
            }

            warn!("Attempt {} failed with {}, retrying", attempt, error_class);
            hint = Some(RecoveryHint {
                failed_sql: sql.clone(),
                error: error.to_string(),
                guidance: error_class.guidance().to_string(),
            });
            previous_error = Some(error_class);
            last_sql = Some(sql);
        }

        Err(LoopFailure {
            error: AssistantError::Generation(format!("Max attempts ({}) exceeded", self.max_attempts)),
            attempted_sql: last_sql,
            attempts: self.max_attempts,
        })
    }

    /// Determine if we should abort based on error patterns
    fn should_abort(&self, current_error: &SqlErrorClass, previous_error: &Option<SqlErrorClass>) -> bool {
        if !self.abort_on_repeat_error {
            return false;
        }

        if let Some(ref prev) = previous_error {
            if prev == current_error {
                warn!("Same error repeated, aborting: {}", current_error);
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::llm::TextGenerator;
    use crate::result::{Cell, Row};
    use crate::store::{RelationalStore, StoreError};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Replies with the scripted statements in order, repeating the last one.
    struct Script {
        replies: Vec<&'static str>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl TextGenerator for Script {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            let reply = self.replies[(*calls).min(self.replies.len() - 1)];
            *calls += 1;
            Ok(reply.to_string())
        }
    }

    /// Accepts only `SELECT Diagnosis FROM DIAGNOSIS`.
    struct Picky;

    impl RelationalStore for Picky {
        fn name(&self) -> &'static str {
            "picky"
        }

        fn run(&self, sql: &str) -> std::result::Result<ResultSet, StoreError> {
            if sql == "SELECT Diagnosis FROM DIAGNOSIS" {
                Ok(ResultSet::new(
                    vec!["Diagnosis".to_string()],
                    vec![Row(vec![Cell::Text("Asthma".to_string())])],
                ))
            } else {
                Err(StoreError::Sqlite(rusqlite::Error::InvalidColumnName(sql.to_string())))
            }
        }

        fn missing_tables(&self) -> std::result::Result<Vec<&'static str>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn parts(replies: Vec<&'static str>) -> (Arc<Script>, SqlTranslator, QueryExecutor) {
        let script = Arc::new(Script {
            replies,
            calls: Mutex::new(0),
        });
        (
            script.clone(),
            SqlTranslator::new(script),
            QueryExecutor::new(Arc::new(Picky)),
        )
    }

    #[tokio::test]
    async fn test_single_attempt_does_not_retry() {
        let (script, translator, executor) = parts(vec!["SELECT Nope FROM DIAGNOSIS", "SELECT Diagnosis FROM DIAGNOSIS"]);
        let failure = ExecutionLoop::single_attempt()
            .execute_with_retry("q", &translator, &executor)
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert_eq!(failure.attempted_sql.unwrap().as_str(), "SELECT Nope FROM DIAGNOSIS");
        assert_eq!(*script.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_within_cap() {
        let (_script, translator, executor) = parts(vec!["SELECT Nope FROM DIAGNOSIS", "SELECT Diagnosis FROM DIAGNOSIS"]);
        let execution = ExecutionLoop::new(3, true)
            .execute_with_retry("q", &translator, &executor)
            .await
            .unwrap();
        assert_eq!(execution.attempts, 2);
        assert_eq!(execution.result.row_count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_error_aborts_before_cap() {
        let (script, translator, executor) = parts(vec!["SELECT Nope FROM DIAGNOSIS"]);
        let failure = ExecutionLoop::new(5, true)
            .execute_with_retry("q", &translator, &executor)
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 2);
        assert_eq!(*script.calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cap_bounds_attempts_without_abort() {
        let (script, translator, executor) = parts(vec!["SELECT Nope FROM DIAGNOSIS"]);
        let failure = ExecutionLoop::new(3, false)
            .execute_with_retry("q", &translator, &executor)
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert_eq!(*script.calls.lock().unwrap(), 3);
        assert!(matches!(failure.error, AssistantError::QueryExecution { .. }));
    }
}
