//! Delta computation module
//!
//! Describes how a new byte stream differs from a baseline in terms of
//! unmodified, modified, inserted and removed fixed-size chunks. Only the
//! baseline's chunk signatures are needed, never its content.

pub mod delta;
pub mod engine;
pub mod error;
pub mod rolling_hash;
pub mod signature;
pub mod source;

pub use delta::{Delta, DeltaOp, DeltaStats};
pub use engine::DeltaEngine;
pub use error::{Result, SyncError};
pub use rolling_hash::RollingHash;
pub use signature::{build_parallel, BaselineInfo, ChunkProbe, SignatureTable, DEFAULT_CHUNK_SIZE};
pub use source::ByteSource;

use std::io::Read;

/// Hash a baseline stream into a signature table
pub fn build_signature_table<R: Read>(baseline: R, chunk_size: usize) -> Result<SignatureTable> {
    SignatureTable::build(baseline, chunk_size)
}

/// Compute the delta of a new stream against a baseline signature table
pub fn compute_delta<R: Read>(
    table: SignatureTable,
    new: R,
    chunk_size: usize,
) -> Result<Delta> {
    DeltaEngine::new(chunk_size)?.compute(table, new)
}
