//! Platform-specific file operations.

use log::debug;
use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Atomically rename a file from source to destination.
///
/// On Windows, rename fails if the destination already exists, so it is
/// removed first.
pub fn atomic_rename(from: &Path, to: &Path) -> std::io::Result<()> {
    #[cfg(windows)]
    {
        if to.exists() {
            fs::remove_file(to)?;
        }
    }

    fs::rename(from, to)
}

/// Make a file writable.
///
/// On Unix systems, this adds owner write permission.
/// On Windows, this removes the read-only attribute.
pub fn make_writable(path: &Path) -> std::io::Result<()> {
    let metadata = fs::metadata(path)?;
    let mut permissions = metadata.permissions();

    #[cfg(unix)]
    {
        let mode = permissions.mode() | 0o200;
        permissions.set_mode(mode);
    }

    #[cfg(not(unix))]
    {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
    }

    fs::set_permissions(path, permissions)
}

/// Delete a file, clearing a read-only flag first.
pub fn remove_file(path: &Path) -> std::io::Result<()> {
    if fs::metadata(path)?.permissions().readonly() {
        debug!("Clearing read-only flag on {}", path.display());
        make_writable(path)?;
    }
    fs::remove_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_rename_replaces_destination() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("new.tmp");
        let to = temp_dir.path().join("version.xml");
        fs::write(&from, b"new").unwrap();
        fs::write(&to, b"old").unwrap();

        atomic_rename(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"new");
    }

    #[test]
    fn test_remove_read_only_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("setup.exe");
        fs::write(&path, b"payload").unwrap();

        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();

        remove_file(&path).unwrap();
        assert!(!path.exists());
    }
}
