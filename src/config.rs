//! Configuration constants and types for filetomb.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default backing image, relative to the working directory.
pub const DEFAULT_IMAGE_NAME: &str = "image.png";

/// Default raw byte sink name when `--raw-log` is given without a path.
pub const DEFAULT_RAW_LOG_NAME: &str = "log.txt";

/// Bytes sampled per destroyed object in pixel-log mode.
pub const DEFAULT_SAMPLE_SIZE: usize = 4;

/// Width of one log entry: one RGBA pixel.
pub const ENTRY_WIDTH: usize = 4;

/// Side length of a freshly created log image.
pub const INITIAL_SIDE: u32 = 2;

/// Configuration for a burial run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TombConfig {
    /// Path of the pixel log image.
    pub image_path: PathBuf,

    /// Number of bytes sampled from each destroyed object.
    pub sample_size: usize,

    /// Keep remnants of objects whose removal ultimately failed.
    pub record_failed: bool,

    /// Optional append-only raw byte sink.
    pub raw_log: Option<PathBuf>,

    /// Files at or below this size are sampled together with their path.
    pub small_file_threshold: Option<u64>,

    /// Seed for the sampling generator. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for TombConfig {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from(DEFAULT_IMAGE_NAME),
            sample_size: DEFAULT_SAMPLE_SIZE,
            record_failed: true,
            raw_log: None,
            small_file_threshold: None,
            seed: None,
        }
    }
}

impl TombConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TombConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(Error::InvalidConfig(
                "Sample size must be greater than 0".to_string(),
            ));
        }
        if self.image_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("Image path is empty".to_string()));
        }
        Ok(())
    }
}
