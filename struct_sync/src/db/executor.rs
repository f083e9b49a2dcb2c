//! SQL executor
//!
//! Runs a bucket of statements as one script, falling back to a statement by
//! statement transaction when the driver rejects the script.

use std::time::Instant;

use crate::db::adapter::DatabaseAdapter;
use crate::error::{Error, Result};

/// SQL executor for one destination connection
pub struct SqlExecutor<'a, A: DatabaseAdapter + ?Sized> {
    adapter: &'a mut A,
}

impl<'a, A: DatabaseAdapter + ?Sized> SqlExecutor<'a, A> {
    /// Create a new SQL executor
    pub fn new(adapter: &'a mut A) -> Self {
        Self { adapter }
    }

    /// Execute the joined script, or its statements in a transaction if that fails
    pub async fn execute_script(&mut self, script: &str, statements: &[String]) -> Result<()> {
        tracing::warn!(sql = %script, "Exec Sql");
        let script = script.trim();
        if script.is_empty() {
            tracing::warn!("sql empty, skip");
            return Ok(());
        }

        let started = Instant::now();
        let mut result = self.adapter.execute(script).await.map(|_| ());

        if let Err(e) = &result {
            // The server may still be applying a timed out script, so replaying
            // it would run the same statements twice.
            if matches!(e, Error::Timeout(_)) {
                tracing::error!(error = %e, "script timed out, not retrying statements");
            } else if !statements.is_empty() {
                tracing::warn!(error = %e, "script execution failed, retrying statements in a transaction");
                match self.adapter.begin().await {
                    Ok(()) => result = self.execute_in_transaction(statements).await,
                    Err(begin_err) => {
                        tracing::error!(error = %begin_err, "begin transaction failed");
                    }
                }
            }
        }

        match &result {
            Ok(()) => tracing::info!(
                used = %format!("{:.6} s", started.elapsed().as_secs_f64()),
                "Execute sql succeed"
            ),
            Err(e) => tracing::error!(error = %e, "execute sql failed"),
        }

        result
    }

    async fn execute_in_transaction(&mut self, statements: &[String]) -> Result<()> {
        for statement in statements {
            if let Err(e) = self.adapter.execute(statement).await {
                if let Err(rollback_err) = self.adapter.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                return Err(e);
            }
        }

        self.adapter.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use crate::schema::types::FieldSchema;

    /// Adapter that rejects whole scripts with a chosen error
    struct ScriptRejecting {
        script_error: fn() -> Error,
        failing: Option<&'static str>,
        log: Vec<String>,
    }

    impl ScriptRejecting {
        fn new(script_error: fn() -> Error) -> Self {
            Self {
                script_error,
                failing: None,
                log: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl DatabaseAdapter for ScriptRejecting {
        async fn list_tables(&mut self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn create_statement(&mut self, _table: &str) -> Result<String> {
            Ok(String::new())
        }

        async fn column_metadata(&mut self, _table: &str) -> Result<IndexMap<String, FieldSchema>> {
            Ok(IndexMap::new())
        }

        async fn execute(&mut self, sql: &str) -> Result<u64> {
            if sql.contains(";\n") {
                return Err((self.script_error)());
            }
            if self.failing.is_some_and(|fragment| sql.contains(fragment)) {
                return Err(Error::ExecutionError(format!("failed: {}", sql)));
            }
            self.log.push(sql.to_string());
            Ok(1)
        }

        async fn begin(&mut self) -> Result<()> {
            self.log.push("START TRANSACTION".to_string());
            Ok(())
        }

        async fn commit(&mut self) -> Result<()> {
            self.log.push("COMMIT".to_string());
            Ok(())
        }

        async fn rollback(&mut self) -> Result<()> {
            self.log.push("ROLLBACK".to_string());
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn statements() -> Vec<String> {
        vec![
            "ALTER TABLE `a` ADD `x` int(11)".to_string(),
            "ALTER TABLE `b` ADD `y` int(11)".to_string(),
        ]
    }

    const SCRIPT: &str = "ALTER TABLE `a` ADD `x` int(11);\nALTER TABLE `b` ADD `y` int(11);\n";

    #[tokio::test]
    async fn test_rejected_script_is_replayed_in_transaction() {
        let mut adapter = ScriptRejecting::new(|| Error::ExecutionError("multi statements".into()));

        SqlExecutor::new(&mut adapter)
            .execute_script(SCRIPT, &statements())
            .await
            .unwrap();

        assert_eq!(
            adapter.log,
            vec![
                "START TRANSACTION".to_string(),
                "ALTER TABLE `a` ADD `x` int(11)".to_string(),
                "ALTER TABLE `b` ADD `y` int(11)".to_string(),
                "COMMIT".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_statement_rolls_back() {
        let mut adapter = ScriptRejecting::new(|| Error::ExecutionError("multi statements".into()));
        adapter.failing = Some("`b`");

        let result = SqlExecutor::new(&mut adapter)
            .execute_script(SCRIPT, &statements())
            .await;

        assert!(matches!(result, Err(Error::ExecutionError(_))));
        assert_eq!(adapter.log.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!adapter.log.contains(&"COMMIT".to_string()));
    }

    #[tokio::test]
    async fn test_timed_out_script_is_not_replayed() {
        let mut adapter = ScriptRejecting::new(|| Error::Timeout("script".into()));

        let result = SqlExecutor::new(&mut adapter)
            .execute_script(SCRIPT, &statements())
            .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(adapter.log.is_empty());
    }

    #[tokio::test]
    async fn test_blank_script_is_skipped() {
        let mut adapter = ScriptRejecting::new(|| Error::ExecutionError("unused".into()));

        SqlExecutor::new(&mut adapter).execute_script("  \n", &[]).await.unwrap();
        assert!(adapter.log.is_empty());
    }
}
