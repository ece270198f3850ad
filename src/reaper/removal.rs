//! Platform-specific removal fallbacks.
//!
//! The reaper escalates through three tiers for each object: direct
//! removal, removal after clearing read-only/immutable attributes, and a
//! shell-level forced delete. The last two differ per platform and sit
//! behind [`ForcedRemoval`].

use crate::reaper::task::ObjectKind;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Capability for removing objects that resist a plain delete.
pub trait ForcedRemoval {
    /// Remove a single object without any recovery.
    fn remove(&self, path: &Path, kind: ObjectKind) -> io::Result<()> {
        match kind {
            ObjectKind::Directory => std::fs::remove_dir(path),
            _ => std::fs::remove_file(path),
        }
    }

    /// Grant the access on `path`'s parent that unlinking needs.
    ///
    /// Only called for objects whose parent is inside the tree being
    /// destroyed.
    fn open_parent(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    /// Clear read-only or immutable attributes that block removal.
    fn clear_immutable(&self, path: &Path, kind: ObjectKind) -> io::Result<()>;

    /// Last resort: delete through the platform shell.
    fn force_remove(&self, path: &Path, kind: ObjectKind) -> io::Result<()>;

    /// Name of this implementation (for logging).
    fn name(&self) -> &'static str;
}

/// Run a helper command, treating a non-zero exit as an error.
fn run(command: &mut Command) -> io::Result<()> {
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{:?} exited with {}", command.get_program(), status),
        ))
    }
}

/// Removal fallbacks for Unix-like systems.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixRemoval;

#[cfg(unix)]
impl ForcedRemoval for UnixRemoval {
    fn open_parent(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        // Unlinking needs write and search permission on the parent.
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let mut perms = std::fs::metadata(parent)?.permissions();
            perms.set_mode(perms.mode() | 0o300);
            std::fs::set_permissions(parent, perms)?;
        }
        Ok(())
    }

    fn clear_immutable(&self, path: &Path, kind: ObjectKind) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        // chmod would follow a symlink to its target.
        if kind != ObjectKind::Symlink {
            let mut perms = std::fs::symlink_metadata(path)?.permissions();
            let extra = if kind == ObjectKind::Directory { 0o700 } else { 0o200 };
            perms.set_mode(perms.mode() | extra);
            std::fs::set_permissions(path, perms)?;

            #[cfg(target_os = "linux")]
            let attr = run(Command::new("chattr").arg("-i").arg("-a").arg(path));
            #[cfg(not(target_os = "linux"))]
            let attr = run(Command::new("chflags").arg("nouchg").arg(path));

            if let Err(e) = attr {
                debug!(path = %path.display(), error = %e, "attribute reset command failed");
            }
        }

        Ok(())
    }

    fn force_remove(&self, path: &Path, kind: ObjectKind) -> io::Result<()> {
        let flags = if kind == ObjectKind::Directory { "-rf" } else { "-f" };
        run(Command::new("rm").arg(flags).arg("--").arg(path))
    }

    fn name(&self) -> &'static str {
        "unix"
    }
}

/// Removal fallbacks for Windows.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsRemoval;

#[cfg(windows)]
impl ForcedRemoval for WindowsRemoval {
    fn clear_immutable(&self, path: &Path, _kind: ObjectKind) -> io::Result<()> {
        let mut perms = std::fs::symlink_metadata(path)?.permissions();
        perms.set_readonly(false);
        std::fs::set_permissions(path, perms)?;

        if let Err(e) = run(Command::new("attrib").args(["-R", "-S", "-H"]).arg(path)) {
            debug!(path = %path.display(), error = %e, "attrib failed");
        }
        Ok(())
    }

    fn force_remove(&self, path: &Path, kind: ObjectKind) -> io::Result<()> {
        let mut command = Command::new("cmd");
        match kind {
            ObjectKind::Directory => command.args(["/C", "rd", "/S", "/Q"]),
            _ => command.args(["/C", "del", "/F", "/Q"]),
        };
        run(command.arg(path))
    }

    fn name(&self) -> &'static str {
        "windows"
    }
}

/// Fallback for platforms without a forced-removal strategy: only direct
/// removal can succeed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoForcedRemoval;

impl ForcedRemoval for NoForcedRemoval {
    fn clear_immutable(&self, _path: &Path, _kind: ObjectKind) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "attribute reset not supported on this platform",
        ))
    }

    fn force_remove(&self, _path: &Path, _kind: ObjectKind) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "forced removal not supported on this platform",
        ))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(unix)]
pub type PlatformRemoval = UnixRemoval;

#[cfg(windows)]
pub type PlatformRemoval = WindowsRemoval;

#[cfg(not(any(unix, windows)))]
pub type PlatformRemoval = NoForcedRemoval;
