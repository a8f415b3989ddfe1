//! Statement execution with transaction-aware failure handling.

use crate::connection::ConnectionManager;
use crate::error::Result;
use tiberius::ToSql;
use tracing::{debug, error};

/// Runs statements and small scalar queries through a [`ConnectionManager`].
///
/// Every failing statement rolls back the manager's open transaction (when
/// one exists) before the error propagates, so a partially-applied batch
/// never survives to commit.
pub struct ScriptExecutor;

impl ScriptExecutor {
    /// Execute one statement. `success` labels the log line.
    pub async fn execute(
        manager: &mut ConnectionManager,
        sql: &str,
        success: &str,
    ) -> Result<()> {
        let result = async {
            // The result stream must be drained before the connection can
            // run another statement.
            manager.client()?.simple_query(sql).await?.into_results().await?;
            Ok(())
        }
        .await;
        Self::finish(manager, result, success).await
    }

    /// Execute one parameterized statement.
    pub async fn execute_with_params(
        manager: &mut ConnectionManager,
        sql: &str,
        params: &[&dyn ToSql],
        success: &str,
    ) -> Result<()> {
        let result = async {
            manager.client()?.execute(sql, params).await?;
            Ok(())
        }
        .await;
        Self::finish(manager, result, success).await
    }

    /// Execute a sequence of statements, stopping at the first failure.
    pub async fn execute_many(
        manager: &mut ConnectionManager,
        statements: &[String],
        success: &str,
    ) -> Result<()> {
        for sql in statements {
            Self::execute(manager, sql, success).await?;
        }
        Ok(())
    }

    /// Run a query whose first row/column is a string, e.g. a generated DDL
    /// statement. Returns `None` when the query produces no row or a NULL.
    pub async fn query_scalar_string(
        manager: &mut ConnectionManager,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Option<String>> {
        let result = async {
            let row = manager.client()?.query(sql, params).await?.into_row().await?;
            Ok(row.and_then(|r| r.get::<&str, usize>(0).map(str::to_string)))
        }
        .await;
        Self::finish(manager, result, "scalar query").await
    }

    /// Run a query whose first row/column is an integer (COUNT-style).
    pub async fn query_scalar_i64(
        manager: &mut ConnectionManager,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<i64> {
        let result = async {
            let row = manager.client()?.query(sql, params).await?.into_row().await?;
            let value = row.and_then(|r| {
                r.try_get::<i64, usize>(0)
                    .ok()
                    .flatten()
                    .or_else(|| r.try_get::<i32, usize>(0).ok().flatten().map(i64::from))
            });
            Ok(value.unwrap_or(0))
        }
        .await;
        Self::finish(manager, result, "count query").await
    }

    /// Run a query returning one string per row, e.g. a drop-statement list
    /// or a key-column list. NULL cells are skipped.
    pub async fn query_strings(
        manager: &mut ConnectionManager,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<String>> {
        let result = async {
            let rows = manager
                .client()?
                .query(sql, params)
                .await?
                .into_first_result()
                .await?;
            Ok(rows
                .iter()
                .filter_map(|r| r.get::<&str, usize>(0).map(str::to_string))
                .collect())
        }
        .await;
        Self::finish(manager, result, "string list query").await
    }

    async fn finish<T>(
        manager: &mut ConnectionManager,
        result: Result<T>,
        success: &str,
    ) -> Result<T> {
        match result {
            Ok(value) => {
                debug!("{}", success);
                Ok(value)
            }
            Err(e) => {
                error!("{} failed: {}", success, e);
                if manager.in_transaction() {
                    if let Err(rollback_err) = manager.rollback().await {
                        error!("Rollback after failure also failed: {}", rollback_err);
                    }
                }
                Err(e)
            }
        }
    }
}
