//! Configuration for the command-line front end
//!
//! Settings come from defaults, optionally overlaid by a TOML file, then by
//! command-line flags.

pub mod error;

pub use error::{ConfigError, ConfigResult};

use crate::report::ReportFormat;
use crate::sync::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Requested chunk size in bytes
    pub chunk_size: usize,

    /// Where the rendered report is written
    pub output: PathBuf,

    pub format: ReportFormat,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            output: PathBuf::from("output.diff"),
            format: ReportFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

impl DiffConfig {
    /// Load a TOML config file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pick the chunk size actually used for a baseline of `baseline_len` bytes.
///
/// A chunk size that is not smaller than the baseline is halved to
/// `baseline_len / 2`; a baseline too small for that is rejected.
pub fn effective_chunk_size(requested: usize, baseline_len: u64) -> ConfigResult<usize> {
    if requested == 0 {
        return Err(ConfigError::InvalidChunkSize(
            "chunk size must be at least 1".to_string(),
        ));
    }

    if (requested as u64) < baseline_len {
        return Ok(requested);
    }

    let halved = baseline_len / 2;
    if halved == 0 {
        return Err(ConfigError::BaselineTooSmall { len: baseline_len });
    }

    tracing::info!(
        requested,
        chunk_size = halved,
        baseline_len,
        "chunk size not smaller than baseline, resizing"
    );
    Ok(halved as usize)
}
