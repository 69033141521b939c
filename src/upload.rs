//! Uploaded-file collaborator contract and staging names.
//!
//! Request handlers hand the normalizer something that has an original file
//! name and can materialize itself at a path. [`MemoryUpload`] covers bodies
//! already buffered in memory; [`LocalFileUpload`] wraps a file on disk (used
//! by the `imgnorm upload` command).
//!
//! Staged uploads are named `{stem}_{YYYYmmdd_HHMMSS_ffffff}{.ext}`. Two
//! uploads of the same name in the same microsecond still get distinct paths:
//! a `-1`, `-2`, … suffix is appended until the name is unused. Uploads with
//! a caller-chosen name (logos, banners) use [`named_path`] instead.

use chrono::NaiveDateTime;
use std::io;
use std::path::{Path, PathBuf};

const FALLBACK_STEM: &str = "upload";

/// An uploaded file awaiting normalization.
pub trait UploadedFile {
    /// Original client-side file name. May contain path components, which
    /// are ignored.
    fn filename(&self) -> &str;

    /// Write the raw upload to `path`.
    fn save(&self, path: &Path) -> io::Result<()>;
}

/// Upload whose body is already in memory.
#[derive(Debug, Clone)]
pub struct MemoryUpload {
    filename: String,
    bytes: Vec<u8>,
}

impl MemoryUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

impl UploadedFile for MemoryUpload {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn save(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

/// Upload backed by an existing file.
#[derive(Debug, Clone)]
pub struct LocalFileUpload {
    path: PathBuf,
    filename: String,
}

impl LocalFileUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, filename }
    }
}

impl UploadedFile for LocalFileUpload {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn save(&self, path: &Path) -> io::Result<()> {
        std::fs::copy(&self.path, path).map(|_| ())
    }
}

/// Split a client file name into `(stem, ".ext")`, dropping any directories.
///
/// Both `/` and `\` count as separators since browsers on Windows send
/// backslashed paths.
fn split_client_name(filename: &str) -> (String, String) {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or("");
    let base = Path::new(base);

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty() && s != "..")
        .unwrap_or_else(|| FALLBACK_STEM.to_string());
    let ext = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

/// Pick an unused path in `folder` for an upload named `filename`.
pub fn staging_path(folder: &Path, filename: &str, now: &NaiveDateTime) -> PathBuf {
    let (stem, ext) = split_client_name(filename);
    let stamp = now.format("%Y%m%d_%H%M%S_%6f");

    let candidate = folder.join(format!("{stem}_{stamp}{ext}"));
    if !candidate.exists() {
        return candidate;
    }
    (1u32..)
        .map(|n| folder.join(format!("{stem}_{stamp}-{n}{ext}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Fixed location for an upload saved under a caller-chosen `stem`.
///
/// The client file name only contributes its extension. An existing file at
/// that path is replaced, so re-uploading a site logo keeps its URL stable.
pub fn named_path(folder: &Path, stem: &str, filename: &str) -> PathBuf {
    let stem = stem
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(FALLBACK_STEM);
    let (_, ext) = split_client_name(filename);
    folder.join(format!("{stem}{ext}"))
}
