//! Configuration validation.

use super::Config;
use crate::error::{Result, SyncError};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    for (side, db) in [("source", &config.source), ("target", &config.target)] {
        if db.host.is_empty() {
            return Err(SyncError::Config(format!("{}.host is required", side)));
        }
        if db.database.is_empty() {
            return Err(SyncError::Config(format!("{}.database is required", side)));
        }
        if db.user.is_empty() {
            return Err(SyncError::Config(format!("{}.user is required", side)));
        }
    }

    // One dialect at a time: both ends must use the same engine.
    if config.source.engine != config.target.engine {
        return Err(SyncError::Config(format!(
            "source.engine '{}' and target.engine '{}' must match",
            config.source.engine, config.target.engine
        )));
    }

    // Cannot synchronize a database with itself
    if config.source.host == config.target.host
        && config.source.port == config.target.port
        && config.source.database == config.target.database
    {
        return Err(SyncError::Config(
            "source and target cannot be the same database".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, SyncConfig};

    fn db(host: &str, port: u16, database: &str) -> DbConfig {
        DbConfig {
            engine: "mssql".to_string(),
            host: host.to_string(),
            port,
            database: database.to_string(),
            user: "sa".to_string(),
            password: "password".to_string(),
            encrypt: false,
            trust_server_cert: true,
        }
    }

    fn valid_config() -> Config {
        Config {
            source: db("src-host", 1433, "northwind"),
            target: db("tgt-host", 1433, "northwind_copy"),
            sync: SyncConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_target_user() {
        let mut config = valid_config();
        config.target.user = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_same_database_rejected() {
        let mut config = valid_config();
        config.target = config.source.clone();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_mismatched_engines_rejected() {
        let mut config = valid_config();
        config.target.engine = "postgres".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_db_config_debug_redacts_password() {
        let mut config = valid_config();
        config.source.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.source);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }
}
