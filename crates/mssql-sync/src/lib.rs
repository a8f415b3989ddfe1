//! # mssql-sync
//!
//! SQL Server schema comparison and data synchronization library.
//!
//! This library compares the schema and data of two SQL Server databases and
//! synchronizes the target to match the source:
//!
//! - **Schema diff** for schemas, tables, columns, indexes and foreign keys
//! - **Database-authored DDL**: creation/alteration scripts are generated by
//!   the source engine itself from its catalog metadata
//! - **Batched, idempotent data copy** using staged batches and anti-join
//!   inserts, safe to re-run after partial failure
//! - **Identity preservation** via scoped `IDENTITY_INSERT` toggling
//! - **All-or-nothing schema changes** inside a single target transaction
//!
//! ## Example
//!
//! ```rust,no_run
//! use mssql_sync::{Config, SyncCoordinator};
//!
//! #[tokio::main]
//! async fn main() -> mssql_sync::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let mut coordinator = SyncCoordinator::new(config)?;
//!     let mut result = coordinator.compare().await?;
//!     coordinator.generate_scripts(&mut result).await?;
//!     let report = coordinator.synchronize(&result).await?;
//!     println!("Inserted {} rows", report.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod compare;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod generator;
pub mod migrate;
pub mod reader;
pub mod scripts;

// Re-exports for convenient access
pub use catalog::{ColumnInfo, ForeignKeyInfo, IndexInfo, SchemaInfo, SchemaSnapshot};
pub use compare::{ComparisonResult, Script};
pub use config::{Config, DbConfig, SyncConfig, TxnBoundary};
pub use connection::ConnectionManager;
pub use coordinator::{SyncCoordinator, SyncReport, SyncState, TableOutcome, TableStatus};
pub use error::{Result, SyncError};
pub use reader::SchemaReader;
pub use scripts::{provider_for, ScriptProvider};
