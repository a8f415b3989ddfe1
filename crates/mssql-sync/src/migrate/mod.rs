//! Batched, idempotent table data copy.
//!
//! Rows travel source → staging → destination. Each batch is extracted with
//! a stable row-number window, bulk-loaded into a session-scoped staging
//! table on the target, then inserted into the destination through an
//! anti-join on the table's key columns. Re-running a partially-completed
//! copy only inserts what is still missing.

use crate::catalog::{clear_order, quote_ident, quote_table_key, split_table_key, ColumnInfo, ForeignKeyInfo};
use crate::connection::ConnectionManager;
use crate::error::{Result, SyncError};
use crate::executor::ScriptExecutor;
use crate::scripts::ScriptProvider;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Rows per extraction window.
pub const BATCH_SIZE: i64 = 200_000;

/// Copies table data between two databases and clears target data when
/// asked.
pub struct DataMigrator<'a> {
    provider: &'a dyn ScriptProvider,
    batch_delay: Duration,
}

impl<'a> DataMigrator<'a> {
    pub fn new(provider: &'a dyn ScriptProvider, batch_delay_ms: u64) -> Self {
        Self {
            provider,
            batch_delay: Duration::from_millis(batch_delay_ms),
        }
    }

    /// Delete all rows from the given tables on the target.
    ///
    /// Constraint checking is disabled for the duration and re-enabled with
    /// revalidation afterwards. Tables are cleared children-first along the
    /// foreign key graph so deletes cannot trip a constraint even if the
    /// disable step was only partially effective. A failing table is logged
    /// and the loop continues. Returns the number of tables cleared.
    pub async fn clear_all_tables(
        &self,
        target: &mut ConnectionManager,
        tables: &[String],
        foreign_keys: &[ForeignKeyInfo],
    ) -> Result<usize> {
        info!("Clearing data in target database");
        ScriptExecutor::execute(
            target,
            self.provider.disable_constraints(),
            "All constraints disabled",
        )
        .await?;

        let mut cleared = 0;
        for table in clear_order(tables, foreign_keys) {
            let sql = self.provider.clear_table(&quote_table_key(&table));
            match ScriptExecutor::execute(target, &sql, "Table cleared").await {
                Ok(()) => {
                    info!(table = %table, "Cleared");
                    cleared += 1;
                }
                Err(e) => error!(table = %table, "Clear failed: {}", e),
            }
        }

        ScriptExecutor::execute(
            target,
            self.provider.enable_constraints(),
            "All constraints re-enabled",
        )
        .await?;
        Ok(cleared)
    }

    /// Copy one table's missing rows from source to target. Returns the
    /// number of rows inserted.
    ///
    /// When the target table has an identity column, IDENTITY_INSERT is
    /// enabled for the copy and always disabled afterwards, even when the
    /// copy fails. A failed identity-mode copy also rolls back the target's
    /// open transaction before the error propagates.
    pub async fn migrate_table(
        &self,
        source: &mut ConnectionManager,
        target: &mut ConnectionManager,
        table: &str,
        columns: &[ColumnInfo],
    ) -> Result<u64> {
        let (schema, bare_table) = split_table_key(table);
        let identity_columns = ScriptExecutor::query_scalar_i64(
            target,
            self.provider.identity_count_query(),
            &[&schema, &bare_table],
        )
        .await?;

        if identity_columns > 0 {
            self.migrate_with_identity(source, target, table, columns).await
        } else {
            let inserted = self.bulk_copy(source, target, table, columns).await?;
            info!(table = %table, rows = inserted, "Data migrated");
            Ok(inserted)
        }
    }

    async fn migrate_with_identity(
        &self,
        source: &mut ConnectionManager,
        target: &mut ConnectionManager,
        table: &str,
        columns: &[ColumnInfo],
    ) -> Result<u64> {
        let table_ref = quote_table_key(table);
        ScriptExecutor::execute(
            target,
            &self.provider.set_identity_insert(&table_ref, true),
            "IDENTITY_INSERT enabled",
        )
        .await?;

        let copy_result = self.bulk_copy(source, target, table, columns).await;

        if copy_result.is_err() && target.in_transaction() {
            target.rollback().await?;
        }

        // The toggle must be undone on both paths; IDENTITY_INSERT is
        // per-session and only one table may hold it at a time.
        let disable = ScriptExecutor::execute(
            target,
            &self.provider.set_identity_insert(&table_ref, false),
            "IDENTITY_INSERT disabled",
        )
        .await;

        let inserted = copy_result?;
        disable?;
        info!(table = %table, rows = inserted, "Data migrated with identity");
        Ok(inserted)
    }

    /// The windowed staging copy loop.
    async fn bulk_copy(
        &self,
        source: &mut ConnectionManager,
        target: &mut ConnectionManager,
        table: &str,
        columns: &[ColumnInfo],
    ) -> Result<u64> {
        let (schema, bare_table) = split_table_key(table);
        let table_ref = quote_table_key(table);

        let total = ScriptExecutor::query_scalar_i64(
            source,
            &self.provider.count_rows(&table_ref),
            &[],
        )
        .await?;

        let mut key_columns = ScriptExecutor::query_strings(
            source,
            self.provider.key_columns_query(),
            &[&schema, &bare_table],
        )
        .await?;
        if key_columns.is_empty() {
            // No primary key: the whole row is the identity.
            key_columns = columns.iter().map(|c| c.name.clone()).collect();
        }

        let column_list = column_list(columns);
        let window_sql = self.provider.window_query(&table_ref, &column_list);

        let mut inserted = 0u64;
        for (batch, (start, end)) in batch_windows(total, BATCH_SIZE).into_iter().enumerate() {
            let staging = staging_table_name();

            ScriptExecutor::execute(
                target,
                &staging_table_ddl(&staging, columns),
                "Staging table created",
            )
            .await?;

            let batch_result = self
                .copy_batch(source, target, &table_ref, &staging, columns, &key_columns, &window_sql, start, end)
                .await;

            // The staging drop runs on both paths. A rollback triggered by
            // the failure may already have removed the table; that is fine.
            let drop_sql = format!("DROP TABLE {}", staging);
            if let Err(e) = ScriptExecutor::execute(target, &drop_sql, "Staging table dropped").await {
                warn!(staging = %staging, "Staging drop failed: {}", e);
            }

            inserted += batch_result.map_err(|e| SyncError::copy(table, e.to_string()))?;

            let processed = ((batch as i64 + 1) * BATCH_SIZE).min(total);
            info!(table = %table, "Progress: {}/{} rows", processed, total);

            if !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        Ok(inserted)
    }

    #[allow(clippy::too_many_arguments)]
    async fn copy_batch(
        &self,
        source: &mut ConnectionManager,
        target: &mut ConnectionManager,
        table_ref: &str,
        staging: &str,
        columns: &[ColumnInfo],
        key_columns: &[String],
        window_sql: &str,
        start: i64,
        end: i64,
    ) -> Result<u64> {
        let rows = source
            .client()?
            .query(window_sql, &[&start, &end])
            .await?
            .into_first_result()
            .await?;

        let mut bulk = target.client()?.bulk_insert(staging).await?;
        for row in rows {
            let mut token_row = tiberius::TokenRow::new();
            for value in row {
                token_row.push(value);
            }
            bulk.send(token_row).await?;
        }
        bulk.finalize().await?;

        let insert_sql = anti_join_insert_sql(table_ref, staging, columns, key_columns);
        let inserted = target.client()?.execute(&insert_sql, &[]).await?.total();
        Ok(inserted)
    }
}

/// Inclusive 1-based row windows covering `total` rows.
fn batch_windows(total: i64, batch_size: i64) -> Vec<(i64, i64)> {
    let mut windows = Vec::new();
    let mut processed = 0;
    while processed < total {
        windows.push((processed + 1, processed + batch_size));
        processed += batch_size;
    }
    windows
}

/// Unique session-scoped staging table name.
fn staging_table_name() -> String {
    format!("#staging_{}", Uuid::new_v4().simple())
}

/// CREATE TABLE statement for a staging table shaped like the destination.
fn staging_table_ddl(staging: &str, columns: &[ColumnInfo]) -> String {
    let definitions: Vec<String> = columns.iter().map(ColumnInfo::definition).collect();
    format!("CREATE TABLE {} ({})", staging, definitions.join(", "))
}

/// Quoted, comma-joined column list.
fn column_list(columns: &[ColumnInfo]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// INSERT of staging rows whose key has no match in the destination.
fn anti_join_insert_sql(
    table_ref: &str,
    staging: &str,
    columns: &[ColumnInfo],
    key_columns: &[String],
) -> String {
    let target_columns = column_list(columns);
    let staging_columns = columns
        .iter()
        .map(|c| format!("src.{}", quote_ident(&c.name)))
        .collect::<Vec<_>>()
        .join(", ");
    let join = key_columns
        .iter()
        .map(|k| format!("tgt.{col} = src.{col}", col = quote_ident(k)))
        .collect::<Vec<_>>()
        .join(" AND ");

    format!(
        "INSERT INTO {table} ({target_columns}) \
         SELECT {staging_columns} FROM {staging} src \
         WHERE NOT EXISTS (SELECT 1 FROM {table} tgt WHERE {join})",
        table = table_ref,
        target_columns = target_columns,
        staging_columns = staging_columns,
        staging = staging,
        join = join,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn col(name: &str, data_type: &str, nullable: bool) -> ColumnInfo {
        ColumnInfo {
            schema: "dbo".into(),
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: nullable,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    #[test]
    fn test_batch_windows_empty_table() {
        assert!(batch_windows(0, 200_000).is_empty());
    }

    #[test]
    fn test_batch_windows_exact_batch() {
        assert_eq!(batch_windows(200_000, 200_000), vec![(1, 200_000)]);
    }

    #[test]
    fn test_batch_windows_one_row_over() {
        // One extra row still gets its own full-width window; the short
        // final batch needs no special casing.
        assert_eq!(
            batch_windows(200_001, 200_000),
            vec![(1, 200_000), (200_001, 400_000)]
        );
    }

    #[test]
    fn test_batch_windows_small_table() {
        assert_eq!(batch_windows(42, 200_000), vec![(1, 200_000)]);
    }

    #[test]
    fn test_staging_table_name_unique() {
        let a = staging_table_name();
        let b = staging_table_name();
        assert!(a.starts_with("#staging_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_staging_table_ddl() {
        let mut notes = col("notes", "nvarchar", true);
        notes.max_length = Some(-1);
        let columns = vec![col("id", "int", false), notes];
        assert_eq!(
            staging_table_ddl("#staging_x", &columns),
            "CREATE TABLE #staging_x ([id] INT NOT NULL, [notes] NVARCHAR(MAX) NULL)"
        );
    }

    #[test]
    fn test_anti_join_insert_sql() {
        let columns = vec![col("id", "int", false), col("name", "nvarchar", true)];
        let keys = vec!["id".to_string()];
        let sql = anti_join_insert_sql("[dbo].[users]", "#staging_x", &columns, &keys);
        assert_eq!(
            sql,
            "INSERT INTO [dbo].[users] ([id], [name]) \
             SELECT src.[id], src.[name] FROM #staging_x src \
             WHERE NOT EXISTS (SELECT 1 FROM [dbo].[users] tgt WHERE tgt.[id] = src.[id])"
        );
    }

    #[test]
    fn test_anti_join_full_row_identity() {
        // No primary key: every column participates in the join.
        let columns = vec![col("a", "int", false), col("b", "int", false)];
        let keys: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let sql = anti_join_insert_sql("[dbo].[t]", "#s", &columns, &keys);
        assert!(sql.contains("tgt.[a] = src.[a] AND tgt.[b] = src.[b]"));
    }
}
