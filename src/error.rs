//! Error types for filetomb.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for filetomb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while burying objects or maintaining the log.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing image could not be decoded or encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Target path does not exist.
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),

    /// Nothing to sample from: empty text or zero-length file.
    #[error("Cannot sample from an empty source")]
    EmptySource,

    /// File shrank between the size check and the read.
    #[error("Sample offset {offset} out of range for source of {size} bytes")]
    OffsetOutOfRange { offset: u64, size: u64 },

    /// Removal blocked by attributes, locks or permissions.
    #[error("Permission denied removing {}: {reason}", path.display())]
    Permission { path: PathBuf, reason: String },

    /// Decoded log header is inconsistent with the image.
    #[error("Corrupt log: {0}")]
    CorruptLog(String),

    /// The 32-bit cursor cannot address any more entries.
    #[error("Log full: need {needed} slots, cursor addresses at most {max}")]
    LogFull { needed: u64, max: u64 },

    /// Target contains the log's own storage.
    #[error("Refusing to destroy {}: it holds the remnant log", .0.display())]
    ProtectedPath(PathBuf),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error only means the object's remnant could not be sampled.
    pub fn is_sample_error(&self) -> bool {
        matches!(self, Error::EmptySource | Error::OffsetOutOfRange { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
