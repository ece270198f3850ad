//! Per-object deletion state.

use serde::{Deserialize, Serialize};
use std::fs::FileType;
use std::path::{Path, PathBuf};

/// Kind of filesystem object, as discovered without following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    File,
    Directory,
    Symlink,
    /// Sockets, FIFOs, device nodes.
    Other,
}

impl ObjectKind {
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_dir() {
            ObjectKind::Directory
        } else if file_type.is_symlink() {
            ObjectKind::Symlink
        } else if file_type.is_file() {
            ObjectKind::File
        } else {
            ObjectKind::Other
        }
    }

    /// Only regular files carry byte content worth sampling.
    pub fn has_content(&self) -> bool {
        matches!(self, ObjectKind::File)
    }
}

/// Which recovery tier finally removed an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalTier {
    Direct,
    AfterAttributeReset,
    Forced,
}

/// Traversal state of a single object.
///
/// `Pending → Sampled → {Removed | Failed}`. An object whose sample could
/// not be taken goes straight from `Pending` to a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Sampled,
    Removed(RemovalTier),
    Failed(String),
}

/// One filesystem object scheduled for destruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionTask {
    pub path: PathBuf,
    pub kind: ObjectKind,
    pub state: TaskState,
}

impl DeletionTask {
    pub fn new(path: &Path, kind: ObjectKind) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            state: TaskState::Pending,
        }
    }

    pub fn mark_sampled(&mut self) {
        debug_assert_eq!(self.state, TaskState::Pending);
        self.state = TaskState::Sampled;
    }

    pub fn mark_removed(&mut self, tier: RemovalTier) {
        debug_assert!(!self.is_terminal());
        self.state = TaskState::Removed(tier);
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        debug_assert!(!self.is_terminal());
        self.state = TaskState::Failed(reason.into());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, TaskState::Removed(_) | TaskState::Failed(_))
    }

    pub fn is_removed(&self) -> bool {
        matches!(self.state, TaskState::Removed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, TaskState::Failed(_))
    }
}
