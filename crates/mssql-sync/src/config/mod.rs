//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_defaults() {
        let yaml = r#"
source:
  host: src-host
  database: northwind
  user: sa
  password: pw
target:
  host: tgt-host
  database: northwind_copy
  user: sa
  password: pw
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.port, 1433);
        assert_eq!(config.source.engine, "mssql");
        assert!(config.sync.include_schema);
        assert!(config.sync.include_data);
        assert!(!config.sync.clear_data_before_insert);
        assert_eq!(config.sync.batch_delay_ms, 1000);
        assert_eq!(config.sync.txn_boundary, TxnBoundary::Run);
    }

    #[test]
    fn test_from_yaml_sync_overrides() {
        let yaml = r#"
source:
  host: a
  database: d1
  user: u
  password: p
target:
  host: b
  database: d2
  user: u
  password: p
sync:
  clear_data_before_insert: true
  include_data: false
  batch_delay_ms: 50
  txn_boundary: table
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.sync.clear_data_before_insert);
        assert!(!config.sync.include_data);
        assert_eq!(config.sync.batch_delay_ms, 50);
        assert_eq!(config.sync.txn_boundary, TxnBoundary::Table);
    }

    #[test]
    fn test_from_yaml_invalid_rejected() {
        assert!(Config::from_yaml("source: 1").is_err());
    }
}
