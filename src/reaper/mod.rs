//! Destructive traversal with remnant sampling.
//!
//! The reaper walks a path bottom-up. For every object it samples a
//! remnant, then removes the object, escalating through the
//! [`ForcedRemoval`] tiers when a plain delete is refused. Failures are
//! recorded per object and never stop the walk.

mod digest;
mod removal;
mod task;
mod walk;

pub use digest::{Remnant, RemnantDigest};
pub use removal::{ForcedRemoval, NoForcedRemoval, PlatformRemoval};
#[cfg(unix)]
pub use removal::UnixRemoval;
#[cfg(windows)]
pub use removal::WindowsRemoval;
pub use task::{DeletionTask, ObjectKind, RemovalTier, TaskState};
pub use walk::{post_order, Visit};

use crate::config::DEFAULT_SAMPLE_SIZE;
use crate::error::{Error, Result};
use crate::sampling::ByteSampler;
use rand::Rng;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of destroying one root path.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    /// Remnants in finalization order.
    pub digest: RemnantDigest,
    /// Every object visited, in finalization order, all terminal.
    pub tasks: Vec<DeletionTask>,
}

impl Harvest {
    /// Number of objects removed.
    pub fn removed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_removed()).count()
    }

    /// Objects that survived every removal tier.
    pub fn failed(&self) -> impl Iterator<Item = &DeletionTask> {
        self.tasks.iter().filter(|t| t.is_failed())
    }

    /// True when every visited object was removed.
    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|t| t.is_removed())
    }

    /// Merge another harvest after this one.
    pub fn extend(&mut self, other: Harvest) {
        self.digest.extend(other.digest);
        self.tasks.extend(other.tasks);
    }
}

/// Destroys filesystem objects, keeping a sampled remnant of each.
pub struct Reaper<R, F> {
    sampler: ByteSampler<R>,
    remover: F,
    sample_size: usize,
    record_failed: bool,
}

impl<R: Rng, F: ForcedRemoval> Reaper<R, F> {
    /// Create a reaper sampling `DEFAULT_SAMPLE_SIZE` bytes per object.
    pub fn new(sampler: ByteSampler<R>, remover: F) -> Self {
        Self {
            sampler,
            remover,
            sample_size: DEFAULT_SAMPLE_SIZE,
            record_failed: true,
        }
    }

    /// Bytes sampled per object.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Whether remnants of objects that could not be removed are kept.
    pub fn with_record_failed(mut self, record_failed: bool) -> Self {
        self.record_failed = record_failed;
        self
    }

    /// The removal backend.
    pub fn remover(&self) -> &F {
        &self.remover
    }

    /// Destroy `root` and everything beneath it.
    ///
    /// Fails only if `root` does not exist. Per-object failures are
    /// recorded in the returned harvest.
    pub fn destroy(&mut self, root: &Path) -> Result<Harvest> {
        match std::fs::symlink_metadata(root) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(root.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }

        let mut harvest = Harvest::default();
        // Paths with a failed or unreadable descendant (or themselves).
        let mut tainted: HashSet<PathBuf> = HashSet::new();

        for visit in post_order(root) {
            match visit {
                Visit::Object { path, kind } => {
                    let allow_forced = !tainted.contains(&path);
                    // The root's parent lies outside the tree.
                    let in_tree = path != root;
                    let task =
                        self.finalize(&path, kind, in_tree, allow_forced, &mut harvest.digest);
                    if task.is_failed() {
                        taint(&mut tainted, &path, root);
                    }
                    harvest.tasks.push(task);
                }
                Visit::Unreadable { path, error } => {
                    warn!(path = %path.display(), error = %error, "cannot read, skipping");
                    taint(&mut tainted, &path, root);
                }
            }
        }

        if !self.record_failed {
            let failed: HashSet<&Path> = harvest
                .tasks
                .iter()
                .filter(|t| t.is_failed())
                .map(|t| t.path.as_path())
                .collect();
            harvest.digest.retain(|r| !failed.contains(r.path.as_path()));
        }

        debug!(
            root = %root.display(),
            objects = harvest.tasks.len(),
            remnants = harvest.digest.len(),
            "harvest complete"
        );
        Ok(harvest)
    }

    /// Sample and remove one object whose descendants are all terminal.
    fn finalize(
        &mut self,
        path: &Path,
        kind: ObjectKind,
        in_tree: bool,
        allow_forced: bool,
        digest: &mut RemnantDigest,
    ) -> DeletionTask {
        let mut task = DeletionTask::new(path, kind);

        match self.sample(path, kind) {
            Ok(bytes) => {
                debug!(path = %path.display(), remnant = %hex::encode(&bytes), "sampled");
                digest.push(Remnant {
                    path: path.to_path_buf(),
                    kind,
                    bytes,
                });
                task.mark_sampled();
            }
            Err(e) if e.is_sample_error() => {
                debug!(path = %path.display(), error = %e, "no remnant taken");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read object for sampling");
            }
        }

        match self.remove(path, kind, in_tree, allow_forced) {
            Ok(tier) => {
                if tier != RemovalTier::Direct {
                    info!(path = %path.display(), ?tier, "removed after recovery");
                }
                task.mark_removed(tier);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove");
                task.mark_failed(e.to_string());
            }
        }

        task
    }

    fn sample(&mut self, path: &Path, kind: ObjectKind) -> Result<Vec<u8>> {
        if kind.has_content() {
            self.sampler.sample_file(path, self.sample_size)
        } else {
            self.sampler
                .sample_text(&path.to_string_lossy(), self.sample_size)
        }
    }

    /// Escalate through the removal tiers.
    fn remove(
        &self,
        path: &Path,
        kind: ObjectKind,
        in_tree: bool,
        allow_forced: bool,
    ) -> Result<RemovalTier> {
        match self.remover.remove(path, kind) {
            Ok(()) => return Ok(RemovalTier::Direct),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RemovalTier::Direct),
            Err(e) => debug!(path = %path.display(), error = %e, "direct removal refused"),
        }

        if in_tree {
            if let Err(e) = self.remover.open_parent(path) {
                debug!(path = %path.display(), error = %e, "parent permission reset failed");
            }
        }
        if let Err(e) = self.remover.clear_immutable(path, kind) {
            debug!(path = %path.display(), error = %e, "attribute reset failed");
        }
        let refused = match self.remover.remove(path, kind) {
            Ok(()) => return Ok(RemovalTier::AfterAttributeReset),
            Err(e) => e,
        };

        if !allow_forced {
            return Err(Error::Permission {
                path: path.to_path_buf(),
                reason: format!("{} (contains entries that could not be removed)", refused),
            });
        }

        let reason = match self.remover.force_remove(path, kind) {
            Ok(()) if !exists(path) => return Ok(RemovalTier::Forced),
            Ok(()) => format!("{} removal reported success but path remains", self.remover.name()),
            Err(e) => e.to_string(),
        };

        Err(Error::Permission {
            path: path.to_path_buf(),
            reason,
        })
    }
}

fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// Mark `path` and its ancestors up to `root` as holding a failure.
fn taint(tainted: &mut HashSet<PathBuf>, path: &Path, root: &Path) {
    for ancestor in path.ancestors() {
        if !tainted.insert(ancestor.to_path_buf()) || ancestor == root {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records every direct removal attempt and refuses locked paths at every tier.
    #[derive(Default)]
    struct Scripted {
        locked: HashSet<PathBuf>,
        attempts: RefCell<Vec<PathBuf>>,
    }

    impl Scripted {
        fn locking(paths: &[PathBuf]) -> Self {
            Self {
                locked: paths.iter().cloned().collect(),
                ..Default::default()
            }
        }

        fn denied() -> io::Error {
            io::Error::new(io::ErrorKind::PermissionDenied, "locked")
        }
    }

    impl ForcedRemoval for Scripted {
        fn remove(&self, path: &Path, kind: ObjectKind) -> io::Result<()> {
            self.attempts.borrow_mut().push(path.to_path_buf());
            if self.locked.contains(path) {
                return Err(Self::denied());
            }
            PlatformRemoval::default().remove(path, kind)
        }

        fn clear_immutable(&self, path: &Path, _kind: ObjectKind) -> io::Result<()> {
            if self.locked.contains(path) {
                return Err(Self::denied());
            }
            Ok(())
        }

        fn force_remove(&self, path: &Path, _kind: ObjectKind) -> io::Result<()> {
            if self.locked.contains(path) {
                return Err(Self::denied());
            }
            // Stands in for the shell; must never be reached for tainted dirs.
            std::fs::remove_dir_all(path)
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn reaper(remover: Scripted) -> Reaper<StdRng, Scripted> {
        Reaper::new(ByteSampler::new(StdRng::seed_from_u64(7)), remover)
    }

    fn make_tree(dir: &Path) -> PathBuf {
        let root = dir.join("root");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join("a.txt"), b"hi").unwrap();
        std::fs::write(root.join("b.txt"), b"yo").unwrap();
        root
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = reaper(Scripted::default()).destroy(&dir.path().join("nope"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_single_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.bin");
        std::fs::write(&file, [7u8; 16]).unwrap();

        let harvest = reaper(Scripted::default()).destroy(&file).unwrap();

        assert!(!file.exists());
        assert!(harvest.is_success());
        assert_eq!(harvest.digest.len(), 1);
        assert_eq!(harvest.digest.iter().next().unwrap().bytes, vec![7u8; 4]);
    }

    #[test]
    fn test_tree_removed_in_post_order() {
        let dir = TempDir::new().unwrap();
        let root = make_tree(dir.path());

        let mut reaper = reaper(Scripted::default());
        let harvest = reaper.destroy(&root).unwrap();

        assert!(!root.exists());
        assert_eq!(harvest.removed_count(), 3);
        let order: Vec<PathBuf> = harvest.digest.iter().map(|r| r.path.clone()).collect();
        assert_eq!(order, vec![root.join("a.txt"), root.join("b.txt"), root.clone()]);
        assert_eq!(
            *reaper.remover().attempts.borrow(),
            vec![root.join("a.txt"), root.join("b.txt"), root.clone()]
        );
    }

    #[test]
    fn test_every_child_terminal_before_parent() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("deep");
        std::fs::create_dir_all(root.join("x").join("y")).unwrap();
        std::fs::write(root.join("x").join("y").join("1"), b"one").unwrap();
        std::fs::write(root.join("x").join("2"), b"two").unwrap();
        std::fs::write(root.join("3"), b"three").unwrap();

        let harvest = reaper(Scripted::default()).destroy(&root).unwrap();

        for (i, task) in harvest.tasks.iter().enumerate() {
            assert!(task.is_terminal());
            if task.kind == ObjectKind::Directory {
                for later in &harvest.tasks[i + 1..] {
                    assert!(
                        !later.path.starts_with(&task.path),
                        "{} finalized after its ancestor",
                        later.path.display()
                    );
                }
            }
        }
        assert_eq!(harvest.tasks.len(), 6);
    }

    #[test]
    fn test_directory_remnant_comes_from_path() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("empty");
        std::fs::create_dir(&root).unwrap();

        let harvest = reaper(Scripted::default()).destroy(&root).unwrap();
        let remnant = harvest.digest.iter().next().unwrap();
        let text = root.to_string_lossy().into_owned();

        assert_eq!(remnant.kind, ObjectKind::Directory);
        assert!(remnant.bytes.iter().all(|b| text.as_bytes().contains(b)));
    }

    #[test]
    fn test_locked_file_isolated() {
        let dir = TempDir::new().unwrap();
        let root = make_tree(dir.path());
        let locked = root.join("a.txt");

        let harvest = reaper(Scripted::locking(&[locked.clone()]))
            .destroy(&root)
            .unwrap();

        assert!(locked.exists());
        assert!(!root.join("b.txt").exists());
        assert!(!harvest.is_success());

        let failed: Vec<&Path> = harvest.failed().map(|t| t.path.as_path()).collect();
        assert_eq!(failed, vec![locked.as_path(), root.as_path()]);

        // Lenient: remnants captured before the failed deletes are kept.
        assert_eq!(harvest.digest.len(), 3);
        assert!(harvest.digest.iter().any(|r| r.path == root.join("b.txt")));
    }

    #[test]
    fn test_strict_mode_drops_failed_remnants() {
        let dir = TempDir::new().unwrap();
        let root = make_tree(dir.path());
        let locked = root.join("a.txt");

        let harvest = reaper(Scripted::locking(&[locked]))
            .with_record_failed(false)
            .destroy(&root)
            .unwrap();

        let kept: Vec<PathBuf> = harvest.digest.iter().map(|r| r.path.clone()).collect();
        assert_eq!(kept, vec![root.join("b.txt")]);
    }

    #[test]
    fn test_empty_file_removed_without_remnant() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("empty.txt");
        std::fs::write(&file, b"").unwrap();

        let harvest = reaper(Scripted::default()).destroy(&file).unwrap();

        assert!(!file.exists());
        assert!(harvest.is_success());
        assert!(harvest.digest.is_empty());
        assert_eq!(harvest.tasks[0].state, TaskState::Removed(RemovalTier::Direct));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let first = {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("data.bin");
            std::fs::write(&file, (0..=255u8).collect::<Vec<_>>()).unwrap();
            reaper(Scripted::default()).destroy(&file).unwrap().digest.entries()
        };
        let second = {
            let dir = TempDir::new().unwrap();
            let file = dir.path().join("data.bin");
            std::fs::write(&file, (0..=255u8).collect::<Vec<_>>()).unwrap();
            reaper(Scripted::default()).destroy(&file).unwrap().digest.entries()
        };
        assert_eq!(first, second);
    }

    #[test]
    fn test_sample_size_respected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"0123456789").unwrap();

        let harvest = reaper(Scripted::default())
            .with_sample_size(32)
            .destroy(&file)
            .unwrap();

        assert_eq!(harvest.digest.iter().next().unwrap().bytes.len(), 32);
        assert_eq!(harvest.digest.entries().len(), 8);
    }

    /// Refuses the first `refusals` direct removals of every path, then
    /// defers to the platform. `force_remove` either deletes or only
    /// claims to.
    struct Flaky {
        refusals: usize,
        honest_force: bool,
        refused: RefCell<Vec<PathBuf>>,
        opened_parents: RefCell<Vec<PathBuf>>,
    }

    impl Flaky {
        fn new(refusals: usize, honest_force: bool) -> Self {
            Self {
                refusals,
                honest_force,
                refused: RefCell::new(Vec::new()),
                opened_parents: RefCell::new(Vec::new()),
            }
        }
    }

    impl ForcedRemoval for Flaky {
        fn remove(&self, path: &Path, kind: ObjectKind) -> io::Result<()> {
            let mut refused = self.refused.borrow_mut();
            if refused.iter().filter(|p| p.as_path() == path).count() < self.refusals {
                refused.push(path.to_path_buf());
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "busy"));
            }
            PlatformRemoval::default().remove(path, kind)
        }

        fn open_parent(&self, path: &Path) -> io::Result<()> {
            self.opened_parents.borrow_mut().push(path.to_path_buf());
            Ok(())
        }

        fn clear_immutable(&self, _path: &Path, _kind: ObjectKind) -> io::Result<()> {
            Ok(())
        }

        fn force_remove(&self, path: &Path, _kind: ObjectKind) -> io::Result<()> {
            if self.honest_force {
                std::fs::remove_dir_all(path).or_else(|_| std::fs::remove_file(path))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn flaky_destroy(dir: &Path, remover: Flaky) -> (PathBuf, Harvest, Flaky) {
        let file = dir.join("stubborn.bin");
        std::fs::write(&file, b"stubborn").unwrap();

        let mut reaper = Reaper::new(ByteSampler::new(StdRng::seed_from_u64(3)), remover);
        let harvest = reaper.destroy(&file).unwrap();
        (file, harvest, reaper.remover)
    }

    #[test]
    fn test_removed_after_attribute_reset() {
        let dir = TempDir::new().unwrap();
        let (file, harvest, _) = flaky_destroy(dir.path(), Flaky::new(1, true));

        assert!(!file.exists());
        assert_eq!(
            harvest.tasks[0].state,
            TaskState::Removed(RemovalTier::AfterAttributeReset)
        );
        assert_eq!(harvest.digest.len(), 1);
    }

    #[test]
    fn test_removed_by_force() {
        let dir = TempDir::new().unwrap();
        let (file, harvest, _) = flaky_destroy(dir.path(), Flaky::new(2, true));

        assert!(!file.exists());
        assert_eq!(harvest.tasks[0].state, TaskState::Removed(RemovalTier::Forced));
    }

    #[test]
    fn test_force_claiming_success_is_failure() {
        let dir = TempDir::new().unwrap();
        let (file, harvest, _) = flaky_destroy(dir.path(), Flaky::new(2, false));

        assert!(file.exists());
        match &harvest.tasks[0].state {
            TaskState::Failed(reason) => {
                assert!(reason.contains("flaky removal reported success but path remains"))
            }
            other => panic!("expected failure, got {:?}", other),
        }
        // Lenient mode still keeps the remnant.
        assert_eq!(harvest.digest.len(), 1);
    }

    #[test]
    fn test_root_parent_permissions_untouched() {
        let dir = TempDir::new().unwrap();
        let (_, _, remover) = flaky_destroy(dir.path(), Flaky::new(1, true));
        assert!(remover.opened_parents.borrow().is_empty());

        let root = make_tree(dir.path());
        let sampler = ByteSampler::new(StdRng::seed_from_u64(3));
        let mut reaper = Reaper::new(sampler, Flaky::new(1, true));
        let harvest = reaper.destroy(&root).unwrap();

        assert!(harvest.is_success());
        assert_eq!(
            *reaper.remover().opened_parents.borrow(),
            vec![root.join("a.txt"), root.join("b.txt")]
        );
    }
}
