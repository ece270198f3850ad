//! File Tomb
//!
//! Irreversibly destroys files and directory trees, keeping a small randomly
//! sampled remnant of each destroyed object in an append-only log that lives
//! in the pixels of a square PNG image.
//!
//! # Features
//!
//! - **Post-order destruction**: children are sampled and removed before the
//!   directory that holds them
//! - **Removal recovery**: attribute reset and a shell-level forced delete
//!   when a plain delete is refused; one stubborn object never stops a run
//! - **Pixel log**: pixel 0 holds a big-endian cursor, every later pixel one
//!   4-byte remnant; the image grows to the smallest square that fits
//! - **Deterministic sampling**: the generator is injected and seedable
//!
//! # Architecture
//!
//! ```text
//! Paths → Reaper (sample + remove, post-order) → PixelLog.append → image.png
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use filetomb::{Tomb, TombConfig};
//! use std::path::PathBuf;
//!
//! let config = TombConfig::default();
//! let mut tomb = Tomb::from_config(&config).unwrap();
//!
//! let report = tomb.bury(&[PathBuf::from("./old_stuff")]).unwrap();
//! println!("{} objects buried, cursor now {}", report.removed, report.cursor);
//! ```

pub mod config;
pub mod error;
pub mod reaper;
pub mod sampling;
pub mod storage;
pub mod tomb;

pub use config::TombConfig;
pub use error::{Error, Result};
pub use reaper::{Reaper, RemnantDigest};
pub use sampling::ByteSampler;
pub use storage::{Entry, PixelLog};
pub use tomb::{BurialReport, Tomb};
