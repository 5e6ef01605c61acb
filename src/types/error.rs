use thiserror::Error;

/// perfrollup error types
#[derive(Error, Debug)]
pub enum RollupError {
    /// Failed to parse a value (period key, filename, JSON artifact)
    #[error("parse error: {0}")]
    Parse(String),

    /// Export file does not satisfy the column schema
    #[error("schema error: {0}")]
    Schema(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write failure
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Rollup store operation failed
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for perfrollup
pub type Result<T> = std::result::Result<T, RollupError>;
