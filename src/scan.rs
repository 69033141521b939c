//! Recursive discovery of images to normalize.
//!
//! Walks a directory tree with `walkdir` and returns every file whose
//! extension matches the requested set, compared case-insensitively. Each
//! path appears once, in sorted order, no matter how many spellings of its
//! extension were requested.
//!
//! Backup directories (see [`backup`](crate::backup)) are not descended into,
//! so a second batch run over the same tree does not pick up `originals/`.

use crate::backup::BACKUP_DIR_NAME;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Photographic formats picked up when the caller gives no extension list.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif"];

/// Lowercase and strip any leading dot, so `".JPG"` and `"jpg"` compare equal.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn matches_extension(path: &Path, wanted: &BTreeSet<String>) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| wanted.contains(&e.to_ascii_lowercase()))
}

/// Find every regular file under `root` with one of `extensions`.
///
/// Unreadable entries are skipped with a warning rather than aborting the scan.
pub fn find_images<S: AsRef<str>>(root: &Path, extensions: &[S]) -> Vec<PathBuf> {
    let wanted: BTreeSet<String> = extensions
        .iter()
        .map(|e| normalize_extension(e.as_ref()))
        .filter(|e| !e.is_empty())
        .collect();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !(entry.depth() > 0 && entry.file_type().is_dir() && entry.file_name() == BACKUP_DIR_NAME)
    });

    let mut found = BTreeSet::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if entry.file_type().is_file() && matches_extension(entry.path(), &wanted) {
            found.insert(entry.into_path());
        }
    }
    found.into_iter().collect()
}
