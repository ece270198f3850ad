//! Storage layer for remnants.
//!
//! This module handles:
//! - The pixel-encoded append-only log and its cursor header
//! - The flat raw byte sink

mod entry;
mod pixel_log;
mod raw_log;

pub use entry::Entry;
pub use pixel_log::{decode_cursor, encode_cursor, side_for, PixelLog};
pub use raw_log::RawLog;
