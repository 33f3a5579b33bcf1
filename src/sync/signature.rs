//! Baseline signature table
//!
//! The baseline is cut into consecutive chunks of `chunk_size` bytes (the
//! last one may be shorter), each hashed independently. The table maps the
//! 1-based chunk ordinal to its signature and is consumed destructively by
//! one delta run: entries are only ever removed, and scans always visit the
//! remaining ordinals in ascending order.

use crate::metrics::recorder::SignatureTimer;
use crate::sync::error::{Result, SyncError};
use crate::sync::rolling_hash::RollingHash;
use crate::sync::source::ByteSource;
use futures::stream::{FuturesOrdered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Read};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default chunk size for signatures
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Chunks hashed per blocking task in [`build_parallel`]
const CHUNKS_PER_TASK: usize = 256;

/// Length and BLAKE3 fingerprint of the baseline a table was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineInfo {
    pub len: u64,
    pub digest: [u8; 32],
}

/// Outcome of probing the table with a signature
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChunkProbe {
    /// First remaining ordinal whose signature matched
    pub matched: Option<u64>,
    /// Ordinals scanned before the match (all remaining ones if none matched)
    pub skipped: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureTable {
    chunk_size: usize,
    baseline: Option<BaselineInfo>,
    entries: BTreeMap<u64, u32>,
}

impl SignatureTable {
    /// Hash a baseline stream chunk by chunk
    pub fn build<R: Read>(reader: R, chunk_size: usize) -> Result<Self> {
        let mut hash = RollingHash::new(chunk_size)?;
        let timer = SignatureTimer::start();
        let mut source = ByteSource::new(reader);
        let mut buffer = vec![0u8; chunk_size];
        let mut entries = BTreeMap::new();
        let mut ordinal = 0u64;

        loop {
            let n = source.read_up_to(&mut buffer)?;
            if n == 0 {
                break;
            }

            hash.reset();
            hash.fill(&buffer[..n])?;
            ordinal += 1;
            entries.insert(ordinal, hash.signature());

            if n < chunk_size {
                break;
            }
        }

        tracing::debug!(
            chunks = ordinal,
            bytes = source.bytes_read(),
            chunk_size,
            "built signature table"
        );
        timer.finish(entries.len(), source.bytes_read());

        Ok(Self {
            chunk_size,
            baseline: Some(BaselineInfo {
                len: source.bytes_read(),
                digest: source.fingerprint(),
            }),
            entries,
        })
    }

    /// Build a table from precomputed signatures, numbered from 1
    pub fn from_signatures<I>(chunk_size: usize, signatures: I) -> Result<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        if chunk_size == 0 {
            return Err(SyncError::InvalidInput(
                "chunk size must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            chunk_size,
            baseline: None,
            entries: (1u64..).zip(signatures).collect(),
        })
    }

    /// Find the first remaining ordinal whose signature equals `signature`.
    ///
    /// Scans in ascending ordinal order and reports every ordinal passed over
    /// before the match, or every remaining ordinal on a miss.
    pub fn find_first_match(&self, signature: u32) -> ChunkProbe {
        match self.first_match(signature) {
            Some(ordinal) => ChunkProbe {
                matched: Some(ordinal),
                skipped: self.skipped_before(ordinal),
            },
            None => ChunkProbe {
                matched: None,
                skipped: self.ordinals().collect(),
            },
        }
    }

    /// First remaining ordinal with `signature`, without collecting the scan
    pub fn first_match(&self, signature: u32) -> Option<u64> {
        self.entries
            .iter()
            .find(|&(_, &stored)| stored == signature)
            .map(|(&ordinal, _)| ordinal)
    }

    /// Remaining ordinals below `ordinal`, ascending
    pub fn skipped_before(&self, ordinal: u64) -> Vec<u64> {
        self.entries.range(..ordinal).map(|(&o, _)| o).collect()
    }

    /// Remove an ordinal. Returns false if it was already gone.
    pub fn remove(&mut self, ordinal: u64) -> bool {
        self.entries.remove(&ordinal).is_some()
    }

    pub fn signature_of(&self, ordinal: u64) -> Option<u32> {
        self.entries.get(&ordinal).copied()
    }

    /// Remaining ordinals, ascending
    pub fn ordinals(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    /// Remaining `(ordinal, signature)` pairs, ascending
    pub fn iter(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.entries.iter().map(|(&o, &s)| (o, s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn baseline(&self) -> Option<&BaselineInfo> {
        self.baseline.as_ref()
    }

    /// Serialize to bytes (using bincode)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let table: Self = bincode::deserialize(data)?;
        if table.chunk_size == 0 {
            return Err(SyncError::InvalidInput(
                "signature file has a zero chunk size".to_string(),
            ));
        }
        Ok(table)
    }
}

/// Build a signature table from an async reader, hashing batches of chunks
/// on the blocking pool.
///
/// At most `num_cpus::get()` batches are hashed at once. Results are joined
/// in stream order, so the table is identical to [`SignatureTable::build`].
pub async fn build_parallel<R>(mut reader: R, chunk_size: usize) -> Result<SignatureTable>
where
    R: AsyncRead + Unpin,
{
    if chunk_size == 0 {
        return Err(SyncError::InvalidInput(
            "chunk size must be at least 1".to_string(),
        ));
    }

    let batch_len = chunk_size.checked_mul(CHUNKS_PER_TASK).ok_or_else(|| {
        SyncError::InvalidInput(format!("chunk size {} is too large", chunk_size))
    })?;
    let workers = num_cpus::get().max(1);
    let timer = SignatureTimer::start();

    let mut hasher = blake3::Hasher::new();
    let mut total = 0u64;
    let mut in_flight = FuturesOrdered::new();
    let mut signatures: Vec<u32> = Vec::new();

    loop {
        let batch = read_batch(&mut reader, batch_len).await?;
        if batch.is_empty() {
            break;
        }

        hasher.update(&batch);
        total += batch.len() as u64;
        let at_end = batch.len() < batch_len;

        in_flight.push_back(tokio::task::spawn_blocking(move || {
            batch
                .chunks(chunk_size)
                .map(RollingHash::checksum)
                .collect::<Vec<u32>>()
        }));

        if in_flight.len() >= workers {
            if let Some(done) = in_flight.next().await {
                signatures.extend(done.map_err(io::Error::other)?);
            }
        }

        if at_end {
            break;
        }
    }

    while let Some(done) = in_flight.next().await {
        signatures.extend(done.map_err(io::Error::other)?);
    }

    tracing::debug!(
        chunks = signatures.len(),
        bytes = total,
        chunk_size,
        workers,
        "built signature table in parallel"
    );
    timer.finish(signatures.len(), total);

    let mut table = SignatureTable::from_signatures(chunk_size, signatures)?;
    table.baseline = Some(BaselineInfo {
        len: total,
        digest: *hasher.finalize().as_bytes(),
    });
    Ok(table)
}

/// Read up to `len` bytes, stopping early only at end of stream
async fn read_batch<R: AsyncRead + Unpin>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut batch = vec![0u8; len];
    let mut filled = 0;

    while filled < len {
        let n = reader.read(&mut batch[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    batch.truncate(filled);
    Ok(batch)
}
