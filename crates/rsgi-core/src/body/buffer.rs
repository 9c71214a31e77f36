//! Spillover body buffer.
//!
//! # Why spill to disk? (for beginners)
//!
//! The adapter must collect the whole response before it can choose which
//! host operation to call, and the application may send a body of any size.
//! Keeping a multi-gigabyte download in RAM would be a problem, so the buffer
//! stores bytes in memory only up to a threshold and then moves everything to
//! an anonymous temporary file.  `tempfile::SpooledTempFile` does exactly this;
//! callers never see the difference.
//!
//! # Layout
//!
//! ```text
//!   spool:  [chunk 0][chunk 1][chunk 2]......
//!           ^read_pos                ^write_pos
//!   chunks: [len 0,   len 1,   len 2]    (unconsumed chunk lengths)
//! ```
//!
//! Chunk boundaries are kept so a streaming response can forward each chunk
//! exactly as the application sent it.

use std::collections::VecDeque;
use std::io::{self, Read, Seek, SeekFrom, Write};

use bytes::Bytes;
use tempfile::SpooledTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use super::Payload;

/// Default in-memory limit before the buffer spills to disk (1 MiB).
pub const DEFAULT_SPOOL_THRESHOLD: usize = 1024 * 1024;

/// Failure of the backing storage.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("body buffer I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Append-only, sequentially consumed byte container with memory→disk
/// spillover.
pub struct BodyBuffer {
    spool: SpooledTempFile,
    threshold: usize,
    /// Lengths of the chunks not yet read back, in append order.
    chunks: VecDeque<usize>,
    write_pos: u64,
    read_pos: u64,
}

impl BodyBuffer {
    /// Creates an empty buffer that spills to disk beyond `threshold` bytes.
    pub fn new(threshold: usize) -> Self {
        Self {
            spool: SpooledTempFile::new(threshold),
            threshold,
            chunks: VecDeque::new(),
            write_pos: 0,
            read_pos: 0,
        }
    }

    /// Appends one chunk.
    ///
    /// Text is stored as UTF-8.  An [`Payload::Unsupported`] value is logged
    /// as a warning and dropped; the return value is then `false` and the
    /// chunk count is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Io`] if the spill file cannot be written.
    pub fn append(&mut self, data: impl Into<Payload>) -> Result<bool, BufferError> {
        let bytes = match data.into() {
            Payload::Bytes(bytes) => bytes,
            Payload::Text(text) => Bytes::from(text.into_bytes()),
            Payload::Unsupported { type_name } => {
                warn!(%type_name, "unsupported body data type; chunk dropped");
                return Ok(false);
            }
        };

        let was_spilled = self.spool.is_rolled();
        self.spool.seek(SeekFrom::Start(self.write_pos))?;
        self.spool.write_all(&bytes)?;
        self.write_pos += bytes.len() as u64;
        self.chunks.push_back(bytes.len());

        if !was_spilled && self.spool.is_rolled() {
            debug!(
                threshold = self.threshold,
                size = self.write_pos,
                "body buffer spilled to disk"
            );
        }
        Ok(true)
    }

    /// Number of chunks not yet read back.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of bytes not yet read back.
    pub fn size(&self) -> u64 {
        self.write_pos - self.read_pos
    }

    /// `true` once the content has moved to backing storage.
    pub fn is_spilled(&self) -> bool {
        self.spool.is_rolled()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Reads back the next chunk exactly as it was appended.
    ///
    /// Returns `Ok(None)` once every chunk has been consumed; the buffer is
    /// then reset and ready for reuse.
    pub fn next_chunk(&mut self) -> Result<Option<Bytes>, BufferError> {
        let Some(len) = self.chunks.pop_front() else {
            self.reset_if_drained();
            return Ok(None);
        };
        let chunk = self.read_at_cursor(len)?;
        self.reset_if_drained();
        Ok(Some(chunk))
    }

    /// Reads back up to `max` bytes, crossing chunk boundaries as needed.
    ///
    /// An empty result means the content is exhausted.
    pub fn read(&mut self, max: usize) -> Result<Bytes, BufferError> {
        let n = max.min(self.size() as usize);
        let data = self.read_at_cursor(n)?;

        let mut left = n;
        while let Some(front) = self.chunks.front_mut() {
            if *front > left {
                *front -= left;
                break;
            }
            left -= *front;
            self.chunks.pop_front();
        }
        self.reset_if_drained();
        Ok(data)
    }

    /// Reads back everything that is left as one contiguous block.
    pub fn read_all(&mut self) -> Result<Bytes, BufferError> {
        let data = self.read_at_cursor(self.size() as usize)?;
        self.chunks.clear();
        self.reset_if_drained();
        Ok(data)
    }

    /// Discards all content and releases the backing storage.
    pub fn clear(&mut self) {
        // Dropping the old spool closes (and thereby deletes) any spill file.
        self.spool = SpooledTempFile::new(self.threshold);
        self.chunks.clear();
        self.write_pos = 0;
        self.read_pos = 0;
    }

    fn read_at_cursor(&mut self, len: usize) -> Result<Bytes, BufferError> {
        let mut data = vec![0u8; len];
        self.spool.seek(SeekFrom::Start(self.read_pos))?;
        self.spool.read_exact(&mut data)?;
        self.read_pos += len as u64;
        Ok(Bytes::from(data))
    }

    fn reset_if_drained(&mut self) {
        if self.chunks.is_empty() && self.read_pos == self.write_pos {
            self.clear();
        }
    }
}

impl Default for BodyBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SPOOL_THRESHOLD)
    }
}

impl std::fmt::Debug for BodyBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyBuffer")
            .field("chunks", &self.chunks.len())
            .field("size", &self.size())
            .field("spilled", &self.is_spilled())
            .field("threshold", &self.threshold)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
