//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database connection settings.
    pub source: DbConfig,

    /// Target database connection settings.
    pub target: DbConfig,

    /// Synchronization behavior settings.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Connection settings for one SQL Server database.
#[derive(Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Engine identifier, selects the script provider (default: "mssql").
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Database host.
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Encrypt connection (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust server certificate (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,
}

// Manual Debug so the password never leaks into logs.
impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

/// Synchronization behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delete all target table data before inserting (default: false).
    #[serde(default)]
    pub clear_data_before_insert: bool,

    /// Apply schema changes (schemas, tables, columns) to the target
    /// (default: true).
    #[serde(default = "default_true")]
    pub include_schema: bool,

    /// Copy table data to the target (default: true).
    #[serde(default = "default_true")]
    pub include_data: bool,

    /// Pause between data batches in milliseconds, to throttle load on the
    /// target (default: 1000).
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,

    /// Unit-of-work boundary for the target transaction (default: run).
    #[serde(default)]
    pub txn_boundary: TxnBoundary,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            clear_data_before_insert: false,
            include_schema: true,
            include_data: true,
            batch_delay_ms: default_batch_delay(),
            txn_boundary: TxnBoundary::default(),
        }
    }
}

/// Scope of the target transaction during synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnBoundary {
    /// One transaction spans the entire synchronization run. All schema and
    /// data changes commit or roll back together, at the cost of long lock
    /// retention on large migrations.
    #[default]
    Run,

    /// Commit after each table's data copy. Schema changes still share the
    /// first transaction; atomicity across tables is given up.
    Table,
}

fn default_engine() -> String {
    "mssql".to_string()
}

fn default_port() -> u16 {
    1433
}

fn default_true() -> bool {
    true
}

fn default_batch_delay() -> u64 {
    1000
}
