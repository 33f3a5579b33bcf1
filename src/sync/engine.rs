//! Delta computation engine
//!
//! Scans the new stream once with a rolling window of `chunk_size` bytes.
//! Before every byte is read the window signature is probed against the
//! baseline table. Bytes evicted from the window since the last match are
//! buffered; when the next match arrives they are classified against the
//! baseline ordinals the probe passed over:
//!
//! - no literal bytes left: the passed-over ordinals were removed
//! - literal bytes left: they are cut into chunk-sized groups, paired with
//!   the passed-over ordinals as modifications, surplus groups are insertions
//!
//! Eviction lags the window by one chunk, so the first `chunk_size` evicted
//! bytes after a match are the matched chunk itself and are trimmed before
//! classification. At end of stream whatever was never matched is flushed
//! against the ordinals still left in the table.

use crate::sync::delta::{Delta, DeltaOp};
use crate::sync::error::{Result, SyncError};
use crate::sync::rolling_hash::RollingHash;
use crate::sync::signature::SignatureTable;
use crate::sync::source::ByteSource;
use std::io::Read;
use std::time::Instant;

/// Single-pass delta engine for one chunk size
#[derive(Debug, Clone)]
pub struct DeltaEngine {
    chunk_size: usize,
}

impl DeltaEngine {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SyncError::InvalidInput(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Compute the delta of `reader` against `table`.
    ///
    /// The table is consumed: every ordinal it holds ends up in exactly one
    /// `Unmodified`, `Modified` or `Removed` op. The new stream must hold at
    /// least one full chunk.
    pub fn compute<R: Read>(&self, table: SignatureTable, reader: R) -> Result<Delta> {
        let chunk_size = self.chunk_size;
        if table.chunk_size() != chunk_size {
            return Err(SyncError::InvalidInput(format!(
                "signature table uses chunk size {}, engine uses {}",
                table.chunk_size(),
                chunk_size
            )));
        }

        let started = Instant::now();
        let mut source = ByteSource::new(reader);
        let mut window = RollingHash::new(chunk_size)?;

        let mut initial = vec![0u8; chunk_size];
        let available = source.read_up_to(&mut initial)?;
        if available < chunk_size {
            return Err(SyncError::TruncatedInput {
                needed: chunk_size,
                available,
            });
        }
        window.fill(&initial)?;

        let mut classifier = Classifier {
            table,
            ops: Vec::new(),
            chunk_size,
        };
        let mut pending: Vec<u8> = Vec::new();
        // Leading pending bytes that belong to the last matched chunk
        let mut residue = 0usize;

        loop {
            if let Some(ordinal) = classifier.table.first_match(window.signature()) {
                let skipped = classifier.table.skipped_before(ordinal);
                let trim = pending.len().min(residue);
                let offset = window.bytes_consumed() / chunk_size as u64;
                tracing::trace!(
                    ordinal,
                    offset,
                    skipped = skipped.len(),
                    literal = pending.len() - trim,
                    "chunk matched"
                );

                classifier.resolve(&pending[trim..], skipped, offset);
                classifier.unmodified(ordinal);
                pending.clear();
                residue = chunk_size;
            }

            match source.next_byte()? {
                Some(byte) => pending.push(window.roll_in(byte)?),
                None => break,
            }
        }

        // Unmatched tail: pending bytes then the window, minus the last match
        let mut tail = pending;
        tail.extend(window.window());
        let trim = tail.len().min(residue);
        let end_offset = source.bytes_read() / chunk_size as u64;
        classifier.finish(&tail[trim..], end_offset);

        let delta = Delta {
            chunk_size,
            target_size: source.bytes_read(),
            target_hash: source.fingerprint(),
            ops: classifier.ops,
        };

        let stats = delta.stats();
        tracing::debug!(
            target_size = delta.target_size,
            ops = stats.total_ops(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "delta computed"
        );
        crate::metrics::recorder::record_delta(&stats, started.elapsed());

        Ok(delta)
    }
}

/// Turns probe results into ops while draining the table
struct Classifier {
    table: SignatureTable,
    ops: Vec<DeltaOp>,
    chunk_size: usize,
}

impl Classifier {
    fn unmodified(&mut self, ordinal: u64) {
        self.table.remove(ordinal);
        self.ops.push(DeltaOp::Unmodified { ordinal });
    }

    fn removed(&mut self, ordinal: u64) {
        self.table.remove(ordinal);
        self.ops.push(DeltaOp::Removed { ordinal });
    }

    /// Classify the literal bytes preceding a match.
    ///
    /// Skipped ordinals left over after pairing stay in the table; a later
    /// match or the final flush decides their fate.
    fn resolve(&mut self, literal: &[u8], skipped: Vec<u64>, offset: u64) {
        if literal.is_empty() {
            for ordinal in skipped {
                self.removed(ordinal);
            }
            return;
        }

        let mut skipped = skipped.into_iter();
        for group in literal.chunks(self.chunk_size) {
            match skipped.next() {
                Some(ordinal) => {
                    self.table.remove(ordinal);
                    self.ops.push(DeltaOp::Modified {
                        ordinal,
                        data: group.to_vec(),
                    });
                }
                None => self.ops.push(DeltaOp::Inserted {
                    offset,
                    data: group.to_vec(),
                }),
            }
        }
    }

    /// Flush the unmatched tail against every ordinal still in the table.
    ///
    /// `offset` is the stream length in chunks, not the window position used
    /// by [`Classifier::resolve`].
    ///
    /// A group whose checksum equals its paired ordinal's signature is
    /// reported unmodified; this is how a short final baseline chunk is
    /// recognised, since the full-width window can never match it.
    fn finish(&mut self, tail: &[u8], offset: u64) {
        let remaining: Vec<u64> = self.table.ordinals().collect();
        let mut remaining = remaining.into_iter();

        for group in tail.chunks(self.chunk_size) {
            match remaining.next() {
                Some(ordinal) => {
                    if self.table.signature_of(ordinal) == Some(RollingHash::checksum(group)) {
                        self.unmodified(ordinal);
                    } else {
                        self.table.remove(ordinal);
                        self.ops.push(DeltaOp::Modified {
                            ordinal,
                            data: group.to_vec(),
                        });
                    }
                }
                None => self.ops.push(DeltaOp::Inserted {
                    offset,
                    data: group.to_vec(),
                }),
            }
        }

        for ordinal in remaining {
            self.removed(ordinal);
        }
    }
}
