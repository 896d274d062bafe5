//! Error types for Flexo

use thiserror::Error;

/// Core error type for Flexo operations
#[derive(Error, Debug)]
pub enum FlexoError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),
}

impl FlexoError {
    /// Whether this error stems from missing or invalid configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, FlexoError::Configuration(_))
    }
}

/// Result type alias for Flexo operations
pub type Result<T> = std::result::Result<T, FlexoError>;
