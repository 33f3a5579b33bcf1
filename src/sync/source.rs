//! Forward-only byte source over any reader
//!
//! Reads are batched through a `BufReader`, but callers still observe the
//! stream one byte at a time. Every byte handed out is also fed to a BLAKE3
//! hasher so a fingerprint of the whole stream is available at the end.

use std::io::{self, BufReader, ErrorKind, Read};

/// Default read buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

pub struct ByteSource<R: Read> {
    reader: BufReader<R>,
    hasher: blake3::Hasher,
    bytes_read: u64,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, reader)
    }

    pub fn with_capacity(capacity: usize, reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            hasher: blake3::Hasher::new(),
            bytes_read: 0,
        }
    }

    /// Read until `buf` is full or the stream ends, returning the byte count.
    ///
    /// Short reads from the underlying reader are retried, so a return value
    /// smaller than `buf.len()` always means end of stream.
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        self.hasher.update(&buf[..filled]);
        self.bytes_read += filled as u64;
        Ok(filled)
    }

    /// Next byte of the stream, or `None` at end of stream
    pub fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        if self.read_up_to(&mut byte)? == 0 {
            return Ok(None);
        }
        Ok(Some(byte[0]))
    }

    /// Total bytes handed out so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// BLAKE3 fingerprint of every byte read so far
    pub fn fingerprint(&self) -> [u8; 32] {
        *self.hasher.finalize().as_bytes()
    }
}
