//! Synchronization orchestration: phase ordering, the run state machine and
//! the structured outcome report.

use crate::catalog::SchemaSnapshot;
use crate::compare::{self, ComparisonResult};
use crate::config::{Config, TxnBoundary};
use crate::connection::ConnectionManager;
use crate::error::{Result, SyncError};
use crate::executor::ScriptExecutor;
use crate::generator::ScriptGenerator;
use crate::migrate::DataMigrator;
use crate::reader::SchemaReader;
use crate::scripts::{provider_for, ScriptProvider};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

/// Lifecycle of one synchronization run.
///
/// `Committed` and `Aborted` are terminal; a new coordinator is needed for
/// another run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Uninitialized,
    Compared,
    Scripted,
    Synchronizing,
    Committed,
    Aborted,
}

/// Outcome of one table's data copy.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    /// Rows were copied (possibly zero, when nothing was missing).
    Migrated { rows: u64 },

    /// The table has no destination on the target and was not copied.
    Skipped,

    /// The copy failed; the run continued with the next table.
    Failed { reason: String },
}

/// Per-table entry of a [`SyncReport`].
#[derive(Debug, Clone, Serialize)]
pub struct TableOutcome {
    pub table: String,
    #[serde(flatten)]
    pub status: TableStatus,
}

/// Structured result of one synchronization run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub foreign_keys_dropped: usize,
    pub indexes_dropped: usize,
    pub tables_cleared: usize,
    pub schema_statements_applied: usize,
    pub indexes_created: usize,
    pub foreign_keys_created: usize,
    pub rows_inserted: u64,
    pub tables: Vec<TableOutcome>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            foreign_keys_dropped: 0,
            indexes_dropped: 0,
            tables_cleared: 0,
            schema_statements_applied: 0,
            indexes_created: 0,
            foreign_keys_created: 0,
            rows_inserted: 0,
            tables: Vec::new(),
        }
    }

    /// Convert to a pretty JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Drives a full compare / script / synchronize run.
pub struct SyncCoordinator {
    config: Config,
    provider: Box<dyn ScriptProvider>,
    state: SyncState,
}

impl SyncCoordinator {
    /// Build a coordinator from validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        let provider = provider_for(&config.source.engine)?;
        Ok(Self {
            config,
            provider,
            state: SyncState::Uninitialized,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Read both schemas and compute their difference.
    ///
    /// Mutates nothing and may be repeated; each call takes fresh snapshots.
    pub async fn compare(&mut self) -> Result<ComparisonResult> {
        self.expect_state(&[
            SyncState::Uninitialized,
            SyncState::Compared,
            SyncState::Scripted,
        ])?;

        let reader = SchemaReader::new(self.provider.as_ref());

        let mut source = ConnectionManager::open_without_transaction(&self.config.source, "source").await?;
        let source_snapshot = reader.read_snapshot(&mut source).await?;
        source.close().await?;

        let mut target = ConnectionManager::open_without_transaction(&self.config.target, "target").await?;
        let target_snapshot = reader.read_snapshot(&mut target).await?;
        target.close().await?;

        let result = compare::compare(&source_snapshot, &target_snapshot);
        info!(
            missing_schemas = result.missing_schemas.len(),
            missing_tables = result.missing_tables.len(),
            missing_columns = result.missing_columns.len(),
            different_columns = result.different_columns.len(),
            missing_indexes = result.missing_indexes.len(),
            missing_foreign_keys = result.missing_foreign_keys.len(),
            "Comparison complete"
        );

        self.state = SyncState::Compared;
        Ok(result)
    }

    /// Generate DDL text for every diff record, in place.
    pub async fn generate_scripts(&mut self, result: &mut ComparisonResult) -> Result<()> {
        self.expect_state(&[SyncState::Compared, SyncState::Scripted])?;

        let mut source = ConnectionManager::open_without_transaction(&self.config.source, "source").await?;
        let generated = ScriptGenerator::new(self.provider.as_ref())
            .generate_all(&mut source, result)
            .await;
        source.close().await?;
        generated?;

        self.state = SyncState::Scripted;
        Ok(())
    }

    /// Apply the comparison result to the target and copy data.
    ///
    /// Schema and DDL failures abort the run; the target transaction is
    /// rolled back at the statement layer, so nothing applied in this run
    /// survives. Data copy failures are per-table and recorded in the
    /// report.
    pub async fn synchronize(&mut self, result: &ComparisonResult) -> Result<SyncReport> {
        self.expect_state(&[SyncState::Scripted])?;
        self.state = SyncState::Synchronizing;

        match self.run_synchronize(result).await {
            Ok(report) => {
                self.state = SyncState::Committed;
                Ok(report)
            }
            Err(e) => {
                self.state = SyncState::Aborted;
                Err(e)
            }
        }
    }

    async fn run_synchronize(&self, result: &ComparisonResult) -> Result<SyncReport> {
        let mut report = SyncReport::new();

        let mut source = ConnectionManager::open_without_transaction(&self.config.source, "source").await?;
        let mut target = ConnectionManager::open_with_transaction(&self.config.target, "target").await?;

        let outcome = self
            .synchronize_inner(result, &mut source, &mut target, &mut report)
            .await;

        // Close both ends regardless of outcome; an uncommitted transaction
        // rolls back with the connection.
        let target_close = target.close().await;
        let source_close = source.close().await;

        outcome?;
        target_close?;
        source_close?;

        report.finished_at = Utc::now();
        Ok(report)
    }

    async fn synchronize_inner(
        &self,
        result: &ComparisonResult,
        source: &mut ConnectionManager,
        target: &mut ConnectionManager,
        report: &mut SyncReport,
    ) -> Result<()> {
        let sync = &self.config.sync;
        let reader = SchemaReader::new(self.provider.as_ref());

        // Table lists are snapshotted before any mutation.
        let target_snapshot = reader.read_snapshot(target).await?;
        let source_snapshot = reader.read_snapshot(source).await?;

        let drop_fks = ScriptExecutor::query_strings(
            target,
            self.provider.drop_all_foreign_keys_query(),
            &[],
        )
        .await?;
        ScriptExecutor::execute_many(target, &drop_fks, "Foreign key dropped").await?;
        report.foreign_keys_dropped = drop_fks.len();

        let drop_indexes = ScriptExecutor::query_strings(
            target,
            self.provider.drop_all_indexes_query(),
            &[],
        )
        .await?;
        ScriptExecutor::execute_many(target, &drop_indexes, "Index dropped").await?;
        report.indexes_dropped = drop_indexes.len();

        let migrator = DataMigrator::new(self.provider.as_ref(), sync.batch_delay_ms);

        if sync.clear_data_before_insert {
            let tables: Vec<String> = target_snapshot.tables.keys().cloned().collect();
            report.tables_cleared = migrator
                .clear_all_tables(target, &tables, &target_snapshot.foreign_keys)
                .await?;
        }

        if sync.include_schema {
            let plan = schema_script_plan(result)?;
            for &(sql, label) in &plan {
                ScriptExecutor::execute(target, sql, label).await?;
            }
            report.schema_statements_applied = plan.len();
        }

        if sync.include_data {
            self.migrate_data(
                result,
                &source_snapshot,
                &target_snapshot,
                source,
                target,
                &migrator,
                report,
            )
            .await?;
        }

        for diff in &result.missing_indexes {
            if let Some(sql) = diff.script.text() {
                ScriptExecutor::execute(target, sql, "Index created").await?;
                report.indexes_created += 1;
            }
        }
        for diff in &result.missing_foreign_keys {
            if let Some(sql) = diff.script.text() {
                ScriptExecutor::execute(target, sql, "Foreign key created").await?;
                report.foreign_keys_created += 1;
            }
        }

        target.commit().await?;
        info!("Synchronization committed");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn migrate_data(
        &self,
        result: &ComparisonResult,
        source_snapshot: &SchemaSnapshot,
        target_snapshot: &SchemaSnapshot,
        source: &mut ConnectionManager,
        target: &mut ConnectionManager,
        migrator: &DataMigrator<'_>,
        report: &mut SyncReport,
    ) -> Result<()> {
        let sync = &self.config.sync;

        for (table, columns) in &source_snapshot.tables {
            let destination_exists = target_snapshot.has_table(table)
                || (sync.include_schema
                    && result
                        .missing_tables
                        .iter()
                        .any(|d| &d.table == table && d.script.is_ready()));
            if !destination_exists {
                report.tables.push(TableOutcome {
                    table: table.clone(),
                    status: TableStatus::Skipped,
                });
                continue;
            }

            match migrator.migrate_table(source, target, table, columns).await {
                Ok(rows) => {
                    report.rows_inserted += rows;
                    report.tables.push(TableOutcome {
                        table: table.clone(),
                        status: TableStatus::Migrated { rows },
                    });
                }
                Err(e) => {
                    error!(table = %table, "Data copy failed: {}", e);
                    report.tables.push(TableOutcome {
                        table: table.clone(),
                        status: TableStatus::Failed {
                            reason: e.to_string(),
                        },
                    });
                    // A failed identity copy rolled the transaction back;
                    // reopen it so later phases still run transactionally.
                    if !target.in_transaction() {
                        target.begin().await?;
                    }
                }
            }

            if sync.txn_boundary == TxnBoundary::Table {
                target.commit().await?;
                target.begin().await?;
            }
        }
        Ok(())
    }

    fn expect_state(&self, allowed: &[SyncState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SyncError::State(format!(
                "operation not allowed in state {:?}",
                self.state
            )))
        }
    }
}

/// Ordered schema statements for the apply phase: schemas, then tables, then
/// column alterations, then column additions.
///
/// Every record in these categories must carry generated text; a `Pending`
/// record here means script generation was skipped or failed.
pub fn schema_script_plan(result: &ComparisonResult) -> Result<Vec<(&str, &'static str)>> {
    let mut plan = Vec::new();

    for diff in &result.missing_schemas {
        let sql = diff.script.text().ok_or_else(|| {
            SyncError::ScriptGeneration(format!("schema '{}' has no script", diff.schema))
        })?;
        plan.push((sql, "Schema created"));
    }
    for diff in &result.missing_tables {
        let sql = diff.script.text().ok_or_else(|| {
            SyncError::ScriptGeneration(format!("table '{}' has no script", diff.table))
        })?;
        plan.push((sql, "Table created"));
    }
    for diff in &result.different_columns {
        let sql = diff.script.text().ok_or_else(|| {
            SyncError::ScriptGeneration(format!(
                "column '{}.{}' has no alter script",
                diff.table, diff.column
            ))
        })?;
        plan.push((sql, "Column altered"));
    }
    for diff in &result.missing_columns {
        let sql = diff.script.text().ok_or_else(|| {
            SyncError::ScriptGeneration(format!(
                "column '{}.{}' has no add script",
                diff.table, diff.column
            ))
        })?;
        plan.push((sql, "Column added"));
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{ColumnDifference, SchemaDifference, Script, TableDifference};
    use crate::config::{DbConfig, SyncConfig};

    fn config() -> Config {
        let db = |host: &str, database: &str| DbConfig {
            engine: "mssql".to_string(),
            host: host.to_string(),
            port: 1433,
            database: database.to_string(),
            user: "sa".to_string(),
            password: "pw".to_string(),
            encrypt: false,
            trust_server_cert: true,
        };
        Config {
            source: db("src", "a"),
            target: db("tgt", "b"),
            sync: SyncConfig::default(),
        }
    }

    fn ready(text: &str) -> Script {
        Script::Ready(text.to_string())
    }

    #[test]
    fn test_new_rejects_unknown_engine() {
        let mut config = config();
        config.source.engine = "oracle".to_string();
        config.target.engine = "oracle".to_string();
        assert!(matches!(
            SyncCoordinator::new(config),
            Err(SyncError::UnknownEngine(_))
        ));
    }

    #[test]
    fn test_initial_state() {
        let coordinator = SyncCoordinator::new(config()).unwrap();
        assert_eq!(coordinator.state(), SyncState::Uninitialized);
    }

    #[tokio::test]
    async fn test_synchronize_requires_scripted_state() {
        let mut coordinator = SyncCoordinator::new(config()).unwrap();
        let result = ComparisonResult::default();
        assert!(matches!(
            coordinator.synchronize(&result).await,
            Err(SyncError::State(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_scripts_requires_compared_state() {
        let mut coordinator = SyncCoordinator::new(config()).unwrap();
        let mut result = ComparisonResult::default();
        assert!(matches!(
            coordinator.generate_scripts(&mut result).await,
            Err(SyncError::State(_))
        ));
    }

    #[test]
    fn test_schema_script_plan_ordering() {
        let result = ComparisonResult {
            missing_schemas: vec![SchemaDifference {
                schema: "sales".into(),
                script: ready("CREATE SCHEMA [sales]"),
            }],
            missing_tables: vec![TableDifference {
                table: "[sales].orders".into(),
                script: ready("CREATE TABLE [sales].[orders] (...)"),
            }],
            missing_columns: vec![ColumnDifference {
                table: "[sales].orders".into(),
                column: "notes".into(),
                source_type: "NVARCHAR(50)".into(),
                target_type: None,
                is_nullable: true,
                script: ready("ALTER TABLE ... ADD ..."),
            }],
            different_columns: vec![ColumnDifference {
                table: "[sales].orders".into(),
                column: "total".into(),
                source_type: "DECIMAL(12,2)".into(),
                target_type: Some("DECIMAL(10,2)".into()),
                is_nullable: false,
                script: ready("ALTER TABLE ... ALTER COLUMN ..."),
            }],
            ..Default::default()
        };

        let plan = schema_script_plan(&result).unwrap();
        let labels: Vec<&str> = plan.iter().map(|(_, label)| *label).collect();
        assert_eq!(
            labels,
            vec!["Schema created", "Table created", "Column altered", "Column added"]
        );
    }

    #[test]
    fn test_schema_script_plan_rejects_pending_required_script() {
        let result = ComparisonResult {
            missing_tables: vec![TableDifference {
                table: "[dbo].orders".into(),
                script: Script::Pending,
            }],
            ..Default::default()
        };
        assert!(matches!(
            schema_script_plan(&result),
            Err(SyncError::ScriptGeneration(_))
        ));
    }

    #[test]
    fn test_report_json_shape() {
        let mut report = SyncReport::new();
        report.rows_inserted = 7;
        report.tables.push(TableOutcome {
            table: "[dbo].orders".into(),
            status: TableStatus::Migrated { rows: 7 },
        });
        report.tables.push(TableOutcome {
            table: "[dbo].broken".into(),
            status: TableStatus::Failed {
                reason: "timeout".into(),
            },
        });

        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"migrated\""));
        assert!(json.contains("\"status\": \"failed\""));
        assert!(json.contains("\"rows_inserted\": 7"));
    }
}
