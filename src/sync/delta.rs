//! Delta data model
//!
//! A delta describes, chunk by chunk, how a new stream differs from the
//! baseline it was compared against. It is descriptive only: it carries the
//! literal bytes of modified and inserted regions, never the baseline's.

use crate::sync::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One classified region of the new stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaOp {
    /// Baseline chunk found unchanged
    Unmodified { ordinal: u64 },
    /// Baseline chunk replaced by `data`
    Modified { ordinal: u64, data: Vec<u8> },
    /// New content with no baseline counterpart, at a chunk offset of the new stream
    Inserted { offset: u64, data: Vec<u8> },
    /// Baseline chunk absent from the new stream
    Removed { ordinal: u64 },
}

impl DeltaOp {
    /// Single-letter tag used in text reports
    pub fn tag(&self) -> char {
        match self {
            DeltaOp::Unmodified { .. } => 'U',
            DeltaOp::Modified { .. } => 'M',
            DeltaOp::Inserted { .. } => 'I',
            DeltaOp::Removed { .. } => 'R',
        }
    }

    /// Baseline ordinal, or the chunk offset for insertions
    pub fn position(&self) -> u64 {
        match self {
            DeltaOp::Unmodified { ordinal }
            | DeltaOp::Modified { ordinal, .. }
            | DeltaOp::Removed { ordinal } => *ordinal,
            DeltaOp::Inserted { offset, .. } => *offset,
        }
    }

    /// Baseline ordinal this op accounts for, if any
    pub fn baseline_ordinal(&self) -> Option<u64> {
        match self {
            DeltaOp::Inserted { .. } => None,
            _ => Some(self.position()),
        }
    }

    /// Literal bytes carried by the op
    pub fn data(&self) -> &[u8] {
        match self {
            DeltaOp::Modified { data, .. } | DeltaOp::Inserted { data, .. } => data.as_slice(),
            _ => &[],
        }
    }
}

/// Ordered result of one delta computation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub chunk_size: usize,
    /// Length of the new stream
    pub target_size: u64,
    /// BLAKE3 fingerprint of the new stream
    pub target_hash: [u8; 32],
    pub ops: Vec<DeltaOp>,
}

impl Delta {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeltaOp> {
        self.ops.iter()
    }

    pub fn ops(&self) -> &[DeltaOp] {
        &self.ops
    }

    /// True when the delta holds only `Unmodified` ops
    pub fn is_identical(&self) -> bool {
        self.ops
            .iter()
            .all(|op| matches!(op, DeltaOp::Unmodified { .. }))
    }

    /// Count ops and literal bytes
    pub fn stats(&self) -> DeltaStats {
        let mut stats = DeltaStats {
            target_size: self.target_size,
            ..Default::default()
        };

        for op in &self.ops {
            match op {
                DeltaOp::Unmodified { .. } => stats.unmodified += 1,
                DeltaOp::Modified { data, .. } => {
                    stats.modified += 1;
                    stats.literal_bytes += data.len() as u64;
                }
                DeltaOp::Inserted { data, .. } => {
                    stats.inserted += 1;
                    stats.literal_bytes += data.len() as u64;
                }
                DeltaOp::Removed { .. } => stats.removed += 1,
            }
        }

        stats
    }

    /// Serialize the delta to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

impl<'a> IntoIterator for &'a Delta {
    type Item = &'a DeltaOp;
    type IntoIter = std::slice::Iter<'a, DeltaOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

/// Statistics about a delta
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaStats {
    pub unmodified: usize,
    pub modified: usize,
    pub inserted: usize,
    pub removed: usize,
    pub literal_bytes: u64,
    pub target_size: u64,
}

impl DeltaStats {
    pub fn total_ops(&self) -> usize {
        self.unmodified + self.modified + self.inserted + self.removed
    }

    /// Percentage of the new stream covered by unchanged chunks
    pub fn reuse_ratio(&self) -> f64 {
        if self.target_size == 0 {
            return 0.0;
        }
        let reused = self.target_size.saturating_sub(self.literal_bytes);
        reused as f64 / self.target_size as f64 * 100.0
    }
}

impl fmt::Display for DeltaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Delta: {} unmodified, {} modified, {} inserted, {} removed, {} literal bytes ({:.1}% reused)",
            self.unmodified,
            self.modified,
            self.inserted,
            self.removed,
            self.literal_bytes,
            self.reuse_ratio()
        )
    }
}
