//! Error types for the synchronization library.

use thiserror::Error;

/// Main error type for synchronization operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not open a connection to a database
    #[error("Connection failed: {message}\n  Context: {context}")]
    Connect { message: String, context: String },

    /// Database query or statement error
    #[error("Database error: {0}")]
    Db(#[from] tiberius::error::Error),

    /// The script provider returned no usable text for a required script
    #[error("Script generation failed: {0}")]
    ScriptGeneration(String),

    /// Data copy failed for a specific table
    #[error("Data copy failed for table {table}: {message}")]
    Copy { table: String, message: String },

    /// No provider registered for a target engine
    #[error("No script provider for engine '{0}'")]
    UnknownEngine(String),

    /// An operation was invoked in the wrong coordinator state
    #[error("Invalid state: {0}")]
    State(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a Connect error with context about where it occurred
    pub fn connect(message: impl Into<String>, context: impl Into<String>) -> Self {
        SyncError::Connect {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Copy error
    pub fn copy(table: impl Into<String>, message: impl Into<String>) -> Self {
        SyncError::Copy {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
