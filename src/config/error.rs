use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Baseline of {len} bytes is too small to chunk")]
    BaselineTooSmall { len: u64 },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
