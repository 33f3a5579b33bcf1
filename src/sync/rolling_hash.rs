//! Rolling hash implementation for delta computation
//!
//! Polynomial rolling checksum over a fixed-size byte window. A window
//! `w_0..w_{k-1}` (oldest first) hashes to `Σ w_i · B^(k-1-i) mod 2^32`,
//! so sliding the window by one byte is a constant-time update:
//!
//! `signature = (signature - evicted · B^(k-1)) · B + incoming`
//!
//! All arithmetic wraps at 32 bits. Eviction multiplies by a precomputed
//! power instead of dividing, which would not be an exact inverse under
//! wraparound.

use crate::sync::error::{Result, SyncError};
use std::collections::VecDeque;

/// Polynomial base. Odd and larger than any byte value.
pub const BASE: u32 = 257;

/// Sliding-window polynomial hash.
#[derive(Debug, Clone)]
pub struct RollingHash {
    signature: u32,
    window: VecDeque<u8>,
    capacity: usize,
    /// `BASE^(capacity - 1) mod 2^32`
    base_pow: u32,
    bytes_consumed: u64,
}

impl RollingHash {
    /// Create a hash with a window of `chunk_size` bytes
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SyncError::InvalidInput(
                "chunk size must be at least 1".to_string(),
            ));
        }

        let exponent = u32::try_from(chunk_size - 1).map_err(|_| {
            SyncError::InvalidInput(format!("chunk size {} is too large", chunk_size))
        })?;

        Ok(Self {
            signature: 0,
            window: VecDeque::with_capacity(chunk_size),
            capacity: chunk_size,
            base_pow: BASE.wrapping_pow(exponent),
            bytes_consumed: 0,
        })
    }

    /// One-shot checksum of `data`, identical to `reset` followed by `fill`
    pub fn checksum(data: &[u8]) -> u32 {
        data.iter().fold(0u32, |acc, &byte| {
            acc.wrapping_mul(BASE).wrapping_add(byte as u32)
        })
    }

    /// Clear the window back to the identity state.
    ///
    /// Also restarts the consumed-byte counter, which counts rolls since the
    /// last reset.
    pub fn reset(&mut self) {
        self.signature = 0;
        self.window.clear();
        self.bytes_consumed = 0;
    }

    /// Append bytes to the window without evicting.
    ///
    /// Used to establish the initial window or to hash a baseline chunk in
    /// one shot. Fails if the window would grow past its capacity.
    pub fn fill(&mut self, data: &[u8]) -> Result<()> {
        if self.window.len() + data.len() > self.capacity {
            return Err(SyncError::InvalidInput(format!(
                "fill of {} bytes overflows window ({} of {} used)",
                data.len(),
                self.window.len(),
                self.capacity
            )));
        }

        for &byte in data {
            self.signature = self.signature.wrapping_mul(BASE).wrapping_add(byte as u32);
            self.window.push_back(byte);
        }

        Ok(())
    }

    /// Slide the window forward by one byte and return the evicted byte.
    ///
    /// Only valid once the window is full.
    pub fn roll_in(&mut self, byte: u8) -> Result<u8> {
        if !self.is_full() {
            return Err(SyncError::InvalidInput(format!(
                "cannot roll a partial window ({} of {} bytes)",
                self.window.len(),
                self.capacity
            )));
        }

        let evicted = match self.window.pop_front() {
            Some(b) => b,
            None => {
                return Err(SyncError::InvalidInput(
                    "cannot roll an empty window".to_string(),
                ))
            }
        };

        self.signature = self
            .signature
            .wrapping_sub((evicted as u32).wrapping_mul(self.base_pow))
            .wrapping_mul(BASE)
            .wrapping_add(byte as u32);
        self.window.push_back(byte);
        self.bytes_consumed += 1;

        Ok(evicted)
    }

    /// Current signature of the window
    pub fn signature(&self) -> u32 {
        self.signature
    }

    /// Bytes rolled in since the last reset
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.window.len() == self.capacity
    }

    /// Bytes currently in the window, oldest first
    pub fn window(&self) -> impl Iterator<Item = u8> + '_ {
        self.window.iter().copied()
    }
}
