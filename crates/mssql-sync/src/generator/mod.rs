//! DDL generation against the source database.
//!
//! Each diff record is resolved by one parameterized metadata query whose
//! single output value is the ready-to-execute statement. Ordering of the
//! generated scripts is the coordinator's concern, not this module's.

use crate::catalog::split_table_key;
use crate::compare::{ComparisonResult, Script};
use crate::connection::ConnectionManager;
use crate::error::{Result, SyncError};
use crate::executor::ScriptExecutor;
use crate::scripts::ScriptProvider;
use tracing::{info, warn};

/// Generates statement text for every record of a [`ComparisonResult`].
pub struct ScriptGenerator<'a> {
    provider: &'a dyn ScriptProvider,
}

impl<'a> ScriptGenerator<'a> {
    pub fn new(provider: &'a dyn ScriptProvider) -> Self {
        Self { provider }
    }

    /// Advance every diff record from `Pending` to `Ready`, querying the
    /// source connection.
    ///
    /// Schema, table and column scripts are required: an empty result is a
    /// generation failure surfaced before the target is touched. Index and
    /// foreign key scripts tolerate an empty result; those records stay
    /// `Pending` and are skipped at execution.
    pub async fn generate_all(
        &self,
        source: &mut ConnectionManager,
        result: &mut ComparisonResult,
    ) -> Result<()> {
        for diff in &mut result.missing_schemas {
            let text = ScriptExecutor::query_scalar_string(
                source,
                self.provider.create_schema_query(),
                &[&diff.schema.as_str()],
            )
            .await?
            .ok_or_else(|| {
                SyncError::ScriptGeneration(format!("no CREATE SCHEMA text for '{}'", diff.schema))
            })?;
            diff.script = Script::Ready(text);
        }

        for diff in &mut result.missing_tables {
            let (schema, table) = split_table_key(&diff.table);
            let text = ScriptExecutor::query_scalar_string(
                source,
                self.provider.create_table_query(),
                &[&schema, &table],
            )
            .await?
            .ok_or_else(|| {
                SyncError::ScriptGeneration(format!("no CREATE TABLE text for '{}'", diff.table))
            })?;
            diff.script = Script::Ready(text);
        }

        for diff in &mut result.missing_columns {
            let (schema, table) = split_table_key(&diff.table);
            let text = ScriptExecutor::query_scalar_string(
                source,
                self.provider.add_column_query(),
                &[&schema, &table, &diff.column.as_str()],
            )
            .await?
            .ok_or_else(|| {
                SyncError::ScriptGeneration(format!(
                    "no ADD COLUMN text for '{}.{}'",
                    diff.table, diff.column
                ))
            })?;
            diff.script = Script::Ready(text);
        }

        for diff in &mut result.different_columns {
            let (schema, table) = split_table_key(&diff.table);
            let text = ScriptExecutor::query_scalar_string(
                source,
                self.provider.alter_column_query(),
                &[&schema, &table, &diff.column.as_str()],
            )
            .await?
            .ok_or_else(|| {
                SyncError::ScriptGeneration(format!(
                    "no ALTER COLUMN text for '{}.{}'",
                    diff.table, diff.column
                ))
            })?;
            diff.script = Script::Ready(text);
        }

        for diff in &mut result.missing_indexes {
            let text = ScriptExecutor::query_scalar_string(
                source,
                self.provider.create_index_query(),
                &[&diff.name.as_str(), &diff.table.as_str(), &diff.schema.as_str()],
            )
            .await?;
            match text {
                Some(text) => diff.script = Script::Ready(text),
                None => warn!(index = %diff.name, table = %diff.table, "No CREATE INDEX text; skipping"),
            }
        }

        for diff in &mut result.missing_foreign_keys {
            let text = ScriptExecutor::query_scalar_string(
                source,
                self.provider.create_foreign_key_query(),
                &[&diff.name.as_str()],
            )
            .await?;
            match text {
                Some(text) => diff.script = Script::Ready(text),
                None => warn!(foreign_key = %diff.name, "No ADD CONSTRAINT text; skipping"),
            }
        }

        info!(
            schemas = result.missing_schemas.len(),
            tables = result.missing_tables.len(),
            add_columns = result.missing_columns.len(),
            alter_columns = result.different_columns.len(),
            indexes = result.missing_indexes.len(),
            foreign_keys = result.missing_foreign_keys.len(),
            "Script generation complete"
        );
        Ok(())
    }
}
