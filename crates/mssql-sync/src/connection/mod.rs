//! Single-connection lifecycle and transaction management.

use crate::config::DbConfig;
use crate::error::{Result, SyncError};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

/// A connected SQL Server client.
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Owns one physical connection and its (at most one) open transaction.
///
/// The transaction is driven by plain `BEGIN TRANSACTION` / `COMMIT` /
/// `ROLLBACK` statements on the connection, so every statement issued
/// through [`ConnectionManager::client`] between `begin` and `commit`
/// participates in it. Closing the manager always releases the physical
/// connection; an uncommitted transaction is rolled back by the server when
/// the connection drops.
pub struct ConnectionManager {
    client: Option<MssqlClient>,
    in_transaction: bool,
    label: String,
}

impl ConnectionManager {
    /// Open a connection without starting a transaction.
    ///
    /// `label` names the connection in logs and error context, e.g.
    /// `"source"` or `"target"`.
    pub async fn open_without_transaction(config: &DbConfig, label: &str) -> Result<Self> {
        let client = connect(config).await.map_err(|e| {
            SyncError::connect(
                e.to_string(),
                format!("{} ({}:{}/{})", label, config.host, config.port, config.database),
            )
        })?;
        debug!(label, host = %config.host, database = %config.database, "Connected");

        Ok(Self {
            client: Some(client),
            in_transaction: false,
            label: label.to_string(),
        })
    }

    /// Open a connection and immediately begin a transaction.
    pub async fn open_with_transaction(config: &DbConfig, label: &str) -> Result<Self> {
        let mut manager = Self::open_without_transaction(config, label).await?;
        manager.begin().await?;
        Ok(manager)
    }

    /// Access the underlying client.
    pub fn client(&mut self) -> Result<&mut MssqlClient> {
        self.client
            .as_mut()
            .ok_or_else(|| SyncError::State(format!("connection '{}' is closed", self.label)))
    }

    /// Whether a transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Begin a transaction. Starting a second one is a state error.
    pub async fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(SyncError::State(format!(
                "connection '{}' already has an open transaction",
                self.label
            )));
        }
        self.client()?
            .simple_query("BEGIN TRANSACTION")
            .await?
            .into_results()
            .await?;
        self.in_transaction = true;
        debug!(label = %self.label, "Transaction started");
        Ok(())
    }

    /// Commit the open transaction. A no-op when none is open.
    pub async fn commit(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.client()?
            .simple_query("COMMIT")
            .await?
            .into_results()
            .await?;
        self.in_transaction = false;
        debug!(label = %self.label, "Transaction committed");
        Ok(())
    }

    /// Roll back the open transaction. A no-op when none is open.
    pub async fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.client()?
            .simple_query("ROLLBACK")
            .await?
            .into_results()
            .await?;
        self.in_transaction = false;
        warn!(label = %self.label, "Transaction rolled back");
        Ok(())
    }

    /// Close the connection, rolling back any open transaction first.
    pub async fn close(mut self) -> Result<()> {
        if self.in_transaction {
            self.rollback().await?;
        }
        if let Some(client) = self.client.take() {
            client.close().await?;
        }
        debug!(label = %self.label, "Connection closed");
        Ok(())
    }
}

/// Build a tiberius client from connection settings.
async fn connect(config: &DbConfig) -> std::result::Result<MssqlClient, tiberius::error::Error> {
    let mut tib = Config::new();
    tib.host(&config.host);
    tib.port(config.port);
    tib.database(&config.database);
    tib.authentication(AuthMethod::sql_server(&config.user, &config.password));

    if config.encrypt {
        if config.trust_server_cert {
            tib.trust_cert();
        }
        tib.encryption(EncryptionLevel::Required);
    } else {
        tib.encryption(EncryptionLevel::NotSupported);
    }

    let tcp = TcpStream::connect(tib.get_addr())
        .await
        .map_err(|e| tiberius::error::Error::Io {
            kind: e.kind(),
            message: e.to_string(),
        })?;
    tcp.set_nodelay(true).ok();

    Client::connect(tib, tcp.compat_write()).await
}
