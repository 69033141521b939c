//! Idempotent source backups.
//!
//! Before a source is normalized for the first time its raw bytes are copied
//! to `<source dir>/originals/<source file name>`. "Already backed up" is
//! decided purely by that file name existing in that one directory: a later
//! source with the same name in the same folder reuses the existing backup
//! and never overwrites it. This is not a content-addressed guarantee.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Name of the backup directory created next to each source.
pub const BACKUP_DIR_NAME: &str = "originals";

/// What [`ensure_backup`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupStatus {
    Created(PathBuf),
    AlreadyPresent(PathBuf),
}

impl BackupStatus {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::AlreadyPresent(path) => path,
        }
    }
}

/// Where the backup for `source` lives (whether or not it exists yet).
pub fn backup_path(source: &Path) -> io::Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("source has no file name: {}", source.display()),
        )
    })?;
    let parent = source.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(BACKUP_DIR_NAME).join(name))
}

/// Copy `source` into its sibling backup directory unless a backup exists.
pub fn ensure_backup(source: &Path) -> io::Result<BackupStatus> {
    let target = backup_path(source)?;
    if target.exists() {
        return Ok(BackupStatus::AlreadyPresent(target));
    }
    fs::metadata(source)?;
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir)?;
    }
    if copy_exclusive(source, &target)? {
        Ok(BackupStatus::Created(target))
    } else {
        Ok(BackupStatus::AlreadyPresent(target))
    }
}

/// Copy `source` to `target` only if `target` does not exist yet.
///
/// Returns `false` when another writer got there first. A copy that fails
/// midway removes the incomplete target.
fn copy_exclusive(source: &Path, target: &Path) -> io::Result<bool> {
    let mut input = File::open(source)?;
    let mut output = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e),
    };
    if let Err(e) = io::copy(&mut input, &mut output) {
        drop(output);
        let _ = fs::remove_file(target);
        return Err(e);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn backup_path_is_sibling_originals() {
        let path = backup_path(Path::new("/site/static/team/lawyer.jpg")).unwrap();
        assert_eq!(path, PathBuf::from("/site/static/team/originals/lawyer.jpg"));
    }

    #[test]
    fn backup_path_for_bare_file_name() {
        let path = backup_path(Path::new("logo.png")).unwrap();
        assert_eq!(path, PathBuf::from("originals/logo.png"));
    }

    #[test]
    fn creates_byte_identical_copy() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.jpg");
        fs::write(&source, b"raw source bytes").unwrap();

        let status = ensure_backup(&source).unwrap();
        assert!(matches!(status, BackupStatus::Created(_)));
        assert_eq!(fs::read(status.path()).unwrap(), b"raw source bytes");
    }

    #[test]
    fn second_call_does_not_overwrite() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.jpg");
        fs::write(&source, b"first").unwrap();
        ensure_backup(&source).unwrap();

        fs::write(&source, b"second").unwrap();
        let status = ensure_backup(&source).unwrap();

        assert!(matches!(status, BackupStatus::AlreadyPresent(_)));
        assert_eq!(fs::read(status.path()).unwrap(), b"first");
        let entries = fs::read_dir(tmp.path().join(BACKUP_DIR_NAME)).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn exclusive_copy_leaves_existing_target_alone() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.jpg");
        let target = tmp.path().join("backup.jpg");
        fs::write(&source, b"new bytes").unwrap();
        fs::write(&target, b"written by someone else").unwrap();

        assert!(!copy_exclusive(&source, &target).unwrap());
        assert_eq!(fs::read(&target).unwrap(), b"written by someone else");
    }

    #[test]
    fn exclusive_copy_creates_missing_target() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.jpg");
        let target = tmp.path().join("backup.jpg");
        fs::write(&source, b"bytes").unwrap();

        assert!(copy_exclusive(&source, &target).unwrap());
        assert_eq!(fs::read(&target).unwrap(), b"bytes");
    }

    #[test]
    fn missing_source_is_error() {
        let tmp = TempDir::new().unwrap();
        assert!(ensure_backup(&tmp.path().join("missing.jpg")).is_err());
    }
}
