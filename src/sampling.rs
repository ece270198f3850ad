//! Random byte sampling from text and file contents.
//!
//! A sample is the remnant kept for a destroyed object: `k` bytes drawn
//! with replacement from either the UTF-8 encoding of a string or the
//! contents of a regular file.

use crate::error::{Error, Result};
use rand::Rng;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::trace;

/// Draws fixed-size random samples using an injected generator.
#[derive(Debug)]
pub struct ByteSampler<R> {
    rng: R,
    small_file_threshold: Option<u64>,
}

impl<R: Rng> ByteSampler<R> {
    /// Create a sampler around the given generator.
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            small_file_threshold: None,
        }
    }

    /// Sample files of at most `threshold` bytes from their contents
    /// followed by their path, so tiny and empty files still leave a remnant.
    pub fn with_small_file_threshold(mut self, threshold: Option<u64>) -> Self {
        self.small_file_threshold = threshold;
        self
    }

    /// Sample `k` bytes from `source`.
    ///
    /// If `source` names an existing regular file its contents are sampled,
    /// otherwise `source` itself is sampled as text.
    pub fn sample(&mut self, source: &str, k: usize) -> Result<Vec<u8>> {
        let path = Path::new(source);
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => self.sample_file(path, k),
            _ => self.sample_text(source, k),
        }
    }

    /// Sample `k` bytes with replacement from the UTF-8 encoding of `text`.
    pub fn sample_text(&mut self, text: &str, k: usize) -> Result<Vec<u8>> {
        self.sample_bytes(text.as_bytes(), k)
    }

    /// Sample `k` bytes with replacement from an in-memory buffer.
    pub fn sample_bytes(&mut self, bytes: &[u8], k: usize) -> Result<Vec<u8>> {
        if bytes.is_empty() {
            return Err(Error::EmptySource);
        }
        Ok((0..k)
            .map(|_| bytes[self.rng.gen_range(0..bytes.len())])
            .collect())
    }

    /// Sample `k` bytes from the contents of a regular file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `k` - Number of bytes to return
    ///
    /// # Returns
    ///
    /// Exactly `k` bytes, read at ascending random offsets in `[0, size)`.
    pub fn sample_file(&mut self, path: &Path, k: usize) -> Result<Vec<u8>> {
        let size = std::fs::metadata(path)?.len();

        if let Some(threshold) = self.small_file_threshold {
            if size <= threshold {
                let mut data = std::fs::read(path)?;
                data.extend_from_slice(path.to_string_lossy().as_bytes());
                return self.sample_bytes(&data, k);
            }
        }

        if size == 0 {
            return Err(Error::EmptySource);
        }

        let offsets = self.draw_offsets(size, k);
        trace!(path = %path.display(), ?offsets, "sampling file");
        read_at_offsets(path, &offsets, size)
    }

    /// Draw `k` offsets uniformly from `[0, size)`, sorted ascending.
    ///
    /// `size` must be non-zero.
    pub fn draw_offsets(&mut self, size: u64, k: usize) -> Vec<u64> {
        let mut offsets: Vec<u64> = (0..k).map(|_| self.rng.gen_range(0..size)).collect();
        offsets.sort_unstable();
        offsets
    }
}

/// Read one byte at each offset.
fn read_at_offsets(path: &Path, offsets: &[u64], size: u64) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::with_capacity(offsets.len());
    let mut byte = [0u8; 1];

    for &offset in offsets {
        file.seek(SeekFrom::Start(offset))?;
        match file.read_exact(&mut byte) {
            Ok(()) => bytes.push(byte[0]),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(Error::OffsetOutOfRange { offset, size });
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(bytes)
}
