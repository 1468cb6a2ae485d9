//! Query Executor
//!
//! Runs translated SQL through a [`RelationalStore`] off the async runtime and
//! turns every store failure into [`AssistantError::QueryExecution`], which
//! keeps the attempted SQL next to the error text.

use crate::error::{AssistantError, Result};
use crate::result::ResultSet;
use crate::sql::SqlText;
use crate::store::RelationalStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn RelationalStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn RelationalStore> {
        &self.store
    }

    /// Execute a generated statement and materialize all rows.
    pub async fn execute(&self, sql: &SqlText) -> Result<ResultSet> {
        let start_time = Instant::now();
        info!("🔍 Executing SQL on {}: {}", self.store.name(), sql);

        let store = Arc::clone(&self.store);
        let statement = sql.as_str().to_string();
        let outcome = tokio::task::spawn_blocking(move || store.run(&statement))
            .await
            .map_err(|e| AssistantError::execution(format!("Query task failed: {}", e), sql))?;

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                info!(
                    "✅ Query returned {} rows ({} columns) in {}ms",
                    result.row_count(),
                    result.columns.len(),
                    elapsed_ms
                );
                Ok(result)
            }
            Err(e) => {
                warn!(error = %e, sql = %sql, "query execution failed after {}ms", elapsed_ms);
                Err(AssistantError::execution(e.to_string(), sql))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Cell, Row};
    use crate::store::StoreError;

    struct FixedStore;

    impl RelationalStore for FixedStore {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn run(&self, sql: &str) -> std::result::Result<ResultSet, StoreError> {
            if sql.starts_with("SELECT") {
                Ok(ResultSet::new(vec!["n".to_string()], vec![Row(vec![Cell::Integer(1)])]))
            } else {
                Err(StoreError::WriteRejected)
            }
        }

        fn missing_tables(&self) -> std::result::Result<Vec<&'static str>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_success_passes_rows_through() {
        let executor = QueryExecutor::new(Arc::new(FixedStore));
        let sql = SqlText::new("SELECT 1 AS n").unwrap();
        let result = executor.execute(&sql).await.unwrap();
        assert_eq!(result.columns, vec!["n"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_attempted_sql() {
        let executor = QueryExecutor::new(Arc::new(FixedStore));
        let sql = SqlText::new("DROP TABLE DIAGNOSIS").unwrap();
        let err = executor.execute(&sql).await.unwrap_err();
        assert_eq!(err.attempted_sql(), Some(&sql));
        assert!(err.to_string().contains("read-only"));
    }
}
