//! Error types for optidb

use thiserror::Error;

/// Core error type for optidb operations
#[derive(Error, Debug)]
pub enum OptidbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for optidb operations
pub type Result<T> = std::result::Result<T, OptidbError>;
