//! Delta rendering for humans and tools
//!
//! Text reports print one line per op: `position | tag | data`, where the
//! position is the baseline ordinal (or the chunk offset for insertions) and
//! data is the literal content, lossily decoded as UTF-8.

use crate::sync::{Delta, DeltaOp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown report format: {0}")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Render a single op as a report line (without newline)
pub fn format_op(op: &DeltaOp) -> String {
    format!(
        "{} | {} | {}",
        op.position(),
        op.tag(),
        String::from_utf8_lossy(op.data())
    )
}

/// Write `delta` to `writer` in the given format
pub fn write_report<W: Write>(
    delta: &Delta,
    format: ReportFormat,
    mut writer: W,
) -> Result<(), ReportError> {
    match format {
        ReportFormat::Text => {
            for op in delta {
                writeln!(writer, "{}", format_op(op))?;
            }
        }
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, delta)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Render `delta` into a string
pub fn render(delta: &Delta, format: ReportFormat) -> Result<String, ReportError> {
    let mut buffer = Vec::new();
    write_report(delta, format, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
