//! Burial orchestration: reap targets, then record their remnants.

use crate::config::TombConfig;
use crate::error::{Error, Result};
use crate::reaper::{
    DeletionTask, ForcedRemoval, Harvest, ObjectKind, PlatformRemoval, Reaper, TaskState,
};
use crate::sampling::ByteSampler;
use crate::storage::{PixelLog, RawLog};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// An object that survived every removal tier.
#[derive(Debug, Clone, Serialize)]
pub struct FailedObject {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one burial run.
#[derive(Debug, Clone, Serialize)]
pub struct BurialReport {
    /// Objects removed from the filesystem.
    pub removed: usize,
    /// Objects left behind.
    pub failed: Vec<FailedObject>,
    /// Entries written to the pixel log by this run.
    pub entries_appended: usize,
    /// Log cursor after the run.
    pub cursor: u32,
    /// Log side length after the run.
    pub side: u32,
}

/// Feeds reaped remnants into the pixel log and optional raw sink.
pub struct Tomb<R, F> {
    reaper: Reaper<R, F>,
    log: PixelLog,
    raw_log: Option<RawLog>,
}

impl Tomb<StdRng, PlatformRemoval> {
    /// Build a tomb for this platform from configuration.
    ///
    /// Opens the pixel log immediately, so a corrupt log aborts the run
    /// before anything is destroyed.
    pub fn from_config(config: &TombConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let sampler =
            ByteSampler::new(rng).with_small_file_threshold(config.small_file_threshold);
        let reaper = Reaper::new(sampler, PlatformRemoval::default())
            .with_sample_size(config.sample_size)
            .with_record_failed(config.record_failed);

        let log = PixelLog::open(&config.image_path)?;
        let raw_log = config.raw_log.as_ref().map(RawLog::new);

        Ok(Self {
            reaper,
            log,
            raw_log,
        })
    }
}

impl<R: Rng, F: ForcedRemoval> Tomb<R, F> {
    pub fn new(reaper: Reaper<R, F>, log: PixelLog) -> Self {
        Self {
            reaper,
            log,
            raw_log: None,
        }
    }

    /// Also append flattened remnant bytes to `raw_log`.
    pub fn with_raw_log(mut self, raw_log: RawLog) -> Self {
        self.raw_log = Some(raw_log);
        self
    }

    /// The pixel log.
    pub fn log(&self) -> &PixelLog {
        &self.log
    }

    /// Destroy every target and persist all remnants in one append.
    ///
    /// Every target is checked before the first deletion: a missing path
    /// fails with `NotFound` and a path holding the log's own files fails
    /// with `ProtectedPath`. Per-object removal failures, and targets that
    /// become unreachable mid-run, are reported, not returned. Persistence
    /// failures are returned and are fatal.
    pub fn bury(&mut self, targets: &[PathBuf]) -> Result<BurialReport> {
        if targets.is_empty() {
            warn!("nothing to bury");
        }

        for target in targets {
            match std::fs::symlink_metadata(target) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(Error::NotFound(target.clone()));
                }
                Err(e) => return Err(e.into()),
            }
            self.check_protected(target)?;
        }

        let mut harvest = Harvest::default();
        for target in targets {
            match self.reaper.destroy(target) {
                Ok(reaped) => harvest.extend(reaped),
                // Already taken by an earlier target that contained it.
                Err(Error::NotFound(path)) => {
                    warn!(path = %path.display(), "target vanished before burial, skipping");
                }
                // Earlier targets are gone; their remnants must still be persisted.
                Err(e) => {
                    warn!(path = %target.display(), error = %e, "could not bury target");
                    let mut task = DeletionTask::new(target, ObjectKind::Other);
                    task.mark_failed(e.to_string());
                    harvest.tasks.push(task);
                }
            }
        }

        let entries = harvest.digest.entries();
        self.log.append(&entries)?;

        if let Some(raw_log) = &self.raw_log {
            raw_log.append(&harvest.digest.flatten())?;
        }

        let report = BurialReport {
            removed: harvest.removed_count(),
            failed: harvest
                .failed()
                .map(|task| FailedObject {
                    path: task.path.clone(),
                    reason: match &task.state {
                        TaskState::Failed(reason) => reason.clone(),
                        _ => String::new(),
                    },
                })
                .collect(),
            entries_appended: entries.len(),
            cursor: self.log.cursor(),
            side: self.log.side(),
        };

        info!(
            removed = report.removed,
            failed = report.failed.len(),
            entries = report.entries_appended,
            cursor = report.cursor,
            "burial complete"
        );
        Ok(report)
    }

    fn check_protected(&self, target: &Path) -> Result<()> {
        let target_resolved = resolve(target)?;
        let protected = std::iter::once(self.log.path())
            .chain(self.raw_log.as_ref().map(RawLog::path));

        for path in protected {
            if resolve(path)?.starts_with(&target_resolved) {
                return Err(Error::ProtectedPath(target.to_path_buf()));
            }
        }
        Ok(())
    }
}

/// Absolute, canonical form of `path` that does not follow its final
/// component and tolerates missing trailing components.
fn resolve(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    if absolute.file_name().is_none() {
        return absolute.canonicalize();
    }

    let mut base = absolute.as_path();
    let mut tail = Vec::new();
    while let (Some(parent), Some(name)) = (base.parent(), base.file_name()) {
        tail.push(name);
        base = parent;
        if let Ok(canonical) = base.canonicalize() {
            return Ok(tail.iter().rev().fold(canonical, |acc, name| acc.join(name)));
        }
    }

    Ok(absolute)
}
