//! Flat append-only byte sink.

use crate::error::Result;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Append-only file receiving flattened remnant bytes.
#[derive(Debug, Clone)]
pub struct RawLog {
    path: PathBuf,
}

impl RawLog {
    /// Create a sink writing to `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the sink file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append bytes to the end of the sink and flush them to disk.
    pub fn append(&self, data: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(data)?;
        file.sync_all()?;

        info!(path = %self.path.display(), bytes = data.len(), "appended raw remnants");
        Ok(())
    }
}
