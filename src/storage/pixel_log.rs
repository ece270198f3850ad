//! Append-only log encoded in the pixels of a square RGBA image.
//!
//! Layout, row-major over a `side × side` grid:
//!
//! ```text
//! slot 0            header: cursor as big-endian u32 across R, G, B, A
//! slot 1..=cursor   entries in append order
//! slot cursor+1..   zero filler
//! ```
//!
//! When an append does not fit, the grid is reshaped to the smallest square
//! that does. Slots keep their linear index, so append order survives the
//! resize while 2D positions change.

use crate::config::INITIAL_SIDE;
use crate::error::{Error, Result};
use crate::storage::Entry;
use image::{ImageFormat, ImageReader, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Slots addressable by a 32-bit cursor plus the header.
const MAX_SLOTS: u64 = u32::MAX as u64 + 1;

/// Encode a cursor into the header pixel channels.
pub fn encode_cursor(cursor: u32) -> [u8; 4] {
    cursor.to_be_bytes()
}

/// Decode the header pixel channels into a cursor.
pub fn decode_cursor(channels: [u8; 4]) -> u32 {
    u32::from_be_bytes(channels)
}

/// Smallest side `n` such that `n² ≥ slots`.
pub fn side_for(slots: u64) -> u32 {
    let mut n = (slots as f64).sqrt() as u64;
    while n * n < slots {
        n += 1;
    }
    while n > 0 && (n - 1) * (n - 1) >= slots {
        n -= 1;
    }
    n as u32
}

/// Image-backed append-only store of 4-byte entries.
#[derive(Debug)]
pub struct PixelLog {
    /// Backing image file.
    path: PathBuf,
    /// In-memory grid; always square.
    image: RgbaImage,
    /// Number of stored entries.
    cursor: u32,
}

impl PixelLog {
    /// Create a fresh, empty log that will persist to `path`.
    ///
    /// Nothing is written until the first append.
    pub fn create(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            image: RgbaImage::new(INITIAL_SIDE, INITIAL_SIDE),
            cursor: 0,
        }
    }

    /// Open the log at `path`, or start a fresh one if the file is absent.
    ///
    /// Fails with `CorruptLog` if the image is not square or its header
    /// cursor exceeds the grid capacity.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no existing log, starting fresh");
            return Ok(Self::create(path));
        }

        let image = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?
            .into_rgba8();

        Self::from_image(path, image)
    }

    fn from_image(path: &Path, image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width != height || width == 0 {
            return Err(Error::CorruptLog(format!(
                "expected a square image, found {}x{}",
                width, height
            )));
        }

        let cursor = decode_cursor(image.get_pixel(0, 0).0);
        let log = Self {
            path: path.to_path_buf(),
            image,
            cursor,
        };

        if cursor as u64 > log.capacity() {
            return Err(Error::CorruptLog(format!(
                "cursor {} exceeds capacity {} of a {}x{} grid",
                cursor,
                log.capacity(),
                width,
                width
            )));
        }

        debug!(
            path = %path.display(),
            side = log.side(),
            cursor,
            "opened log"
        );
        Ok(log)
    }

    /// Path of the backing image.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current grid side length.
    pub fn side(&self) -> u32 {
        self.image.width()
    }

    /// Maximum number of entries the current grid can hold.
    pub fn capacity(&self) -> u64 {
        self.slots() - 1
    }

    /// Number of entries stored.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Whether no entries have been stored.
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    fn slots(&self) -> u64 {
        let side = self.side() as u64;
        side * side
    }

    fn position(&self, slot: u64) -> (u32, u32) {
        let side = self.side() as u64;
        ((slot % side) as u32, (slot / side) as u32)
    }

    /// Entry number `index`, if it has been stored.
    pub fn get(&self, index: u32) -> Option<Entry> {
        if index >= self.cursor {
            return None;
        }
        let (x, y) = self.position(index as u64 + 1);
        Some(Entry::from(*self.image.get_pixel(x, y)))
    }

    /// All stored entries in append order.
    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        (0..self.cursor).filter_map(move |index| self.get(index))
    }

    /// Append entries, growing the grid if needed, then persist.
    ///
    /// # Arguments
    ///
    /// * `entries` - Entries to store, in order
    ///
    /// # Returns
    ///
    /// Ok(()) once the updated grid is on disk. An error leaves the
    /// in-memory log ahead of the file and must be treated as fatal.
    pub fn append(&mut self, entries: &[Entry]) -> Result<()> {
        let required = self.cursor as u64 + entries.len() as u64 + 1;
        if required > MAX_SLOTS {
            return Err(Error::LogFull {
                needed: required,
                max: MAX_SLOTS,
            });
        }

        if required > self.slots() {
            self.grow(required);
        }

        for entry in entries {
            let (x, y) = self.position(self.cursor as u64 + 1);
            self.image.put_pixel(x, y, Rgba::from(*entry));
            self.cursor += 1;
        }

        self.image.put_pixel(0, 0, Rgba(encode_cursor(self.cursor)));
        self.save()
    }

    /// Reshape to the smallest square holding `required` slots.
    fn grow(&mut self, required: u64) {
        let new_side = side_for(required);
        let mut grown = RgbaImage::new(new_side, new_side);

        // Header plus every occupied entry slot.
        for slot in 0..=self.cursor as u64 {
            let (x, y) = self.position(slot);
            let pixel = *self.image.get_pixel(x, y);
            let new_x = (slot % new_side as u64) as u32;
            let new_y = (slot / new_side as u64) as u32;
            grown.put_pixel(new_x, new_y, pixel);
        }

        debug!(
            old_side = self.side(),
            new_side,
            cursor = self.cursor,
            "resized log"
        );
        self.image = grown;
    }

    /// Write the full grid to the backing file as PNG.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.image.save_with_format(&self.path, ImageFormat::Png)?;
        info!(
            path = %self.path.display(),
            side = self.side(),
            cursor = self.cursor,
            "persisted log"
        );
        Ok(())
    }
}
