//! chunkdiff: chunk-granular delta computation with a rolling checksum
//!
//! Build a [`SignatureTable`] from the baseline stream, then run a
//! [`DeltaEngine`] over the new stream to get an ordered [`Delta`] of
//! unmodified, modified, inserted and removed chunks.

pub mod config;
pub mod metrics;
pub mod report;
pub mod sync;

pub use sync::{
    build_signature_table, compute_delta, Delta, DeltaEngine, DeltaOp, DeltaStats, RollingHash,
    SignatureTable, SyncError,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
