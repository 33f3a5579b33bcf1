use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Truncated input: need at least {needed} bytes, got {available}")]
    TruncatedInput { needed: usize, available: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
