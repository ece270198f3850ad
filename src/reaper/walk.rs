//! Post-order traversal over a filesystem tree.

use crate::reaper::task::ObjectKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One step of a post-order walk.
#[derive(Debug)]
pub enum Visit {
    /// An object whose descendants, if any, have all been visited.
    Object { path: PathBuf, kind: ObjectKind },
    /// A path whose listing or metadata could not be read.
    Unreadable { path: PathBuf, error: walkdir::Error },
}

/// Walk `root` children-first without following any links.
///
/// Siblings are visited in file-name order so runs are reproducible.
/// Each directory is yielded only after every entry beneath it. The
/// listing of a directory is read in full before its first child is
/// yielded, so callers may delete children while iterating.
pub fn post_order(root: &Path) -> impl Iterator<Item = Visit> {
    let root_path = root.to_path_buf();
    WalkDir::new(root)
        .follow_links(false)
        .follow_root_links(false)
        .contents_first(true)
        .sort_by_file_name()
        .into_iter()
        .map(move |entry| match entry {
            Ok(entry) => Visit::Object {
                kind: ObjectKind::from_file_type(entry.file_type()),
                path: entry.into_path(),
            },
            Err(error) => Visit::Unreadable {
                path: error
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root_path.clone()),
                error,
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn objects(root: &Path) -> Vec<(PathBuf, ObjectKind)> {
        post_order(root)
            .filter_map(|visit| match visit {
                Visit::Object { path, kind } => Some((path, kind)),
                Visit::Unreadable { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_children_before_parents() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("a.txt"), b"a").unwrap();
        std::fs::write(root.join("sub").join("b.txt"), b"b").unwrap();

        let visited: Vec<PathBuf> = objects(&root).into_iter().map(|(p, _)| p).collect();

        assert_eq!(
            visited,
            vec![
                root.join("a.txt"),
                root.join("sub").join("b.txt"),
                root.join("sub"),
                root.clone(),
            ]
        );
    }

    #[test]
    fn test_single_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("lone.bin");
        std::fs::write(&file, b"data").unwrap();

        assert_eq!(objects(&file), vec![(file.clone(), ObjectKind::File)]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        let root = dir.path().join("root");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("keep.txt"), b"keep").unwrap();
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&target, root.join("link")).unwrap();

        let visited = objects(&root);

        assert_eq!(
            visited,
            vec![
                (root.join("link"), ObjectKind::Symlink),
                (root.clone(), ObjectKind::Directory),
            ]
        );
    }
}
