//! Fixed-width log entries.

use crate::config::ENTRY_WIDTH;
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One 4-byte digest tuple, stored as a single RGBA pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry(pub [u8; ENTRY_WIDTH]);

impl Entry {
    /// Split a remnant into entries, zero-padding the last one.
    ///
    /// A 4-byte remnant yields exactly one entry.
    pub fn from_remnant(bytes: &[u8]) -> Vec<Entry> {
        bytes
            .chunks(ENTRY_WIDTH)
            .map(|chunk| {
                let mut raw = [0u8; ENTRY_WIDTH];
                raw[..chunk.len()].copy_from_slice(chunk);
                Entry(raw)
            })
            .collect()
    }

    /// Raw bytes of this entry.
    pub fn bytes(&self) -> [u8; ENTRY_WIDTH] {
        self.0
    }
}

impl From<[u8; ENTRY_WIDTH]> for Entry {
    fn from(raw: [u8; ENTRY_WIDTH]) -> Self {
        Entry(raw)
    }
}

impl From<Rgba<u8>> for Entry {
    fn from(pixel: Rgba<u8>) -> Self {
        Entry(pixel.0)
    }
}

impl From<Entry> for Rgba<u8> {
    fn from(entry: Entry) -> Self {
        Rgba(entry.0)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
