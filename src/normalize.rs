//! The image normalizer.
//!
//! [`Normalizer`] owns an explicit [`NormalizerConfig`] and a backend, and
//! exposes these entry points:
//!
//! | Operation | Input | Result |
//! |---|---|---|
//! | [`normalize`](Normalizer::normalize) | one file on disk | [`NormalizeOutcome`] |
//! | [`normalize_upload`](Normalizer::normalize_upload) | an [`UploadedFile`] + folder | [`UploadOutcome`] |
//! | [`normalize_upload_as`](Normalizer::normalize_upload_as) | the same, plus a fixed file stem | [`UploadOutcome`] |
//! | [`normalize_directory`](Normalizer::normalize_directory) | a directory tree | [`BatchReport`] |
//!
//! None of them return errors. Every decode, encode or I/O failure is logged
//! with its kind and folded into a failure outcome, so one bad file never
//! aborts a batch or a request handler. Callers that want the root cause use
//! [`try_normalize`](Normalizer::try_normalize) instead.
//!
//! Everything runs synchronously on the calling thread. Concurrent calls on
//! the same source path race on the filesystem; serialize them per path.

use crate::backup::{BackupStatus, ensure_backup};
use crate::batch::{BatchEvent, BatchReport, FileReport};
use crate::imaging::{
    BackendError, ImageBackend, NormalizeParams, OUTPUT_EXTENSION, Quality, RustBackend,
    reduction_percent,
};
use crate::scan::{DEFAULT_EXTENSIONS, find_images};
use crate::upload::{UploadedFile, named_path, staging_path};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Settings fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub quality: Quality,
    /// Upper bound on the longer edge, in pixels.
    pub max_dimension: u32,
    /// Snapshot sources into `originals/` before transforming them.
    pub backup_enabled: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            max_dimension: 2560,
            backup_enabled: true,
        }
    }
}

/// A successfully written derivative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedImage {
    pub output_path: PathBuf,
    pub original_size: u64,
    pub output_size: u64,
    pub width: u32,
    pub height: u32,
}

/// Uniform result of [`Normalizer::normalize`].
///
/// On failure `ok` is false, both sizes are zero and there is no output path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizeOutcome {
    pub ok: bool,
    pub original_size: u64,
    pub output_size: u64,
    pub output_path: Option<PathBuf>,
}

impl NormalizeOutcome {
    pub fn failed() -> Self {
        Self {
            ok: false,
            original_size: 0,
            output_size: 0,
            output_path: None,
        }
    }
}

impl From<NormalizedImage> for NormalizeOutcome {
    fn from(image: NormalizedImage) -> Self {
        Self {
            ok: true,
            original_size: image.original_size,
            output_size: image.output_size,
            output_path: Some(image.output_path),
        }
    }
}

/// Result of [`Normalizer::normalize_upload`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub ok: bool,
    pub output_path: Option<PathBuf>,
    /// User-displayable status line.
    pub message: String,
    /// The staged raw upload. Left on disk in every case, so callers can fall
    /// back to the un-normalized file when `ok` is false.
    pub raw_path: Option<PathBuf>,
}

pub const UPLOAD_FAILED_MESSAGE: &str = "Image optimization failed while processing the upload.";

/// Default output location: the source with its extension swapped.
pub fn default_output_path(source: &Path) -> PathBuf {
    source.with_extension(OUTPUT_EXTENSION)
}

pub struct Normalizer<B: ImageBackend = RustBackend> {
    config: NormalizerConfig,
    backend: B,
}

impl Normalizer<RustBackend> {
    pub fn new(config: NormalizerConfig) -> Self {
        Self::with_backend(config, RustBackend::new())
    }
}

impl<B: ImageBackend> Normalizer<B> {
    /// Build a normalizer around a specific backend (allows testing with mock).
    pub fn with_backend(config: NormalizerConfig, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize one file, surfacing the typed error.
    ///
    /// `destination` defaults to [`default_output_path`].
    pub fn try_normalize(
        &self,
        source: &Path,
        destination: Option<&Path>,
    ) -> Result<NormalizedImage, BackendError> {
        let output = destination
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(source));

        if self.config.backup_enabled {
            if let BackupStatus::Created(path) = ensure_backup(source)? {
                tracing::debug!(
                    source = %source.display(),
                    backup = %path.display(),
                    "backup created"
                );
            }
        }

        let original_size = std::fs::metadata(source)?.len();
        let dims = self.backend.normalize(&NormalizeParams {
            source: source.to_path_buf(),
            output: output.clone(),
            max_dimension: self.config.max_dimension,
            quality: self.config.quality,
        })?;
        let output_size = std::fs::metadata(&output)?.len();

        tracing::info!(
            source = %source.display(),
            output = %output.display(),
            original_size,
            output_size,
            width = dims.width,
            height = dims.height,
            "image normalized"
        );

        Ok(NormalizedImage {
            output_path: output,
            original_size,
            output_size,
            width: dims.width,
            height: dims.height,
        })
    }

    /// Normalize one file. Never fails; see [`NormalizeOutcome`].
    pub fn normalize(&self, source: &Path, destination: Option<&Path>) -> NormalizeOutcome {
        match self.try_normalize(source, destination) {
            Ok(image) => image.into(),
            Err(e) => {
                tracing::error!(
                    source = %source.display(),
                    error_kind = e.kind(),
                    error = %e,
                    "normalization failed"
                );
                NormalizeOutcome::failed()
            }
        }
    }

    /// Stage an upload in `folder` under a collision-resistant name, then
    /// normalize it next to itself.
    pub fn normalize_upload(&self, upload: &impl UploadedFile, folder: &Path) -> UploadOutcome {
        let staged = stage_upload(upload, folder, |filename| {
            staging_path(folder, filename, &chrono::Local::now().naive_local())
        });
        self.finish_upload(upload, folder, staged)
    }

    /// Like [`normalize_upload`](Self::normalize_upload), but the raw file is
    /// saved as `{stem}{.ext}` and the output as `{stem}.webp`, replacing any
    /// earlier upload under the same stem. Used for site assets whose path
    /// is stored once (logos, banners).
    pub fn normalize_upload_as(
        &self,
        upload: &impl UploadedFile,
        folder: &Path,
        stem: &str,
    ) -> UploadOutcome {
        let staged = stage_upload(upload, folder, |filename| named_path(folder, stem, filename));
        self.finish_upload(upload, folder, staged)
    }

    fn finish_upload(
        &self,
        upload: &impl UploadedFile,
        folder: &Path,
        staged: std::io::Result<PathBuf>,
    ) -> UploadOutcome {
        let staged = match staged {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(
                    filename = upload.filename(),
                    folder = %folder.display(),
                    error_kind = "io",
                    error = %e,
                    "failed to stage upload"
                );
                return UploadOutcome {
                    ok: false,
                    output_path: None,
                    message: format!("Unexpected error while processing the image upload: {e}"),
                    raw_path: None,
                };
            }
        };
        tracing::debug!(staged = %staged.display(), "upload staged");

        let outcome = self.normalize(&staged, None);
        if !outcome.ok {
            tracing::warn!(staged = %staged.display(), "{}", UPLOAD_FAILED_MESSAGE);
            return UploadOutcome {
                ok: false,
                output_path: None,
                message: UPLOAD_FAILED_MESSAGE.to_string(),
                raw_path: Some(staged),
            };
        }

        let reduction = reduction_percent(outcome.original_size, outcome.output_size);
        let message = format!("Image optimized successfully! Reduction: {reduction:.1}% as WebP.");
        tracing::info!(staged = %staged.display(), "{}", message);
        UploadOutcome {
            ok: true,
            output_path: outcome.output_path,
            message,
            raw_path: Some(staged),
        }
    }

    /// Normalize every matching file under `root`, one at a time.
    ///
    /// `extensions` defaults to [`DEFAULT_EXTENSIONS`]. A failure on one file
    /// is counted and the batch moves on. Progress is sent to `events` when
    /// given; a dropped receiver is ignored.
    pub fn normalize_directory<S: AsRef<str>>(
        &self,
        root: &Path,
        extensions: Option<&[S]>,
        events: Option<Sender<BatchEvent>>,
    ) -> BatchReport {
        let images = match extensions {
            Some(exts) => find_images(root, exts),
            None => find_images(root, DEFAULT_EXTENSIONS),
        };
        let total = images.len();
        let emit = |event: BatchEvent| {
            if let Some(tx) = &events {
                let _ = tx.send(event);
            }
        };

        tracing::info!(root = %root.display(), total, "batch started");
        emit(BatchEvent::Started {
            root: root.to_path_buf(),
            total,
        });

        let mut report = BatchReport::new(total);
        for (i, path) in images.into_iter().enumerate() {
            let index = i + 1;
            let outcome = self.normalize(&path, None);
            match outcome.output_path {
                Some(output_path) if outcome.ok => {
                    let file = FileReport::new(
                        path.clone(),
                        output_path,
                        outcome.original_size,
                        outcome.output_size,
                    );
                    emit(BatchEvent::FileNormalized {
                        index,
                        total,
                        file: file.clone(),
                    });
                    let output = file.output_path.clone();
                    if !report.record_success(file) {
                        tracing::warn!(
                            source = %path.display(),
                            output = %output.display(),
                            "output already written earlier in this batch, overwritten"
                        );
                    }
                }
                _ => {
                    tracing::warn!(path = %path.display(), "batch item failed");
                    emit(BatchEvent::FileFailed {
                        index,
                        total,
                        path: path.clone(),
                    });
                    report.record_failure(path);
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "batch finished"
        );
        emit(BatchEvent::Finished {
            succeeded: report.succeeded,
            failed: report.failed,
        });
        report
    }
}

fn stage_upload(
    upload: &impl UploadedFile,
    folder: &Path,
    pick_path: impl FnOnce(&str) -> PathBuf,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(folder)?;
    let staged = pick_path(upload.filename());
    upload.save(&staged)?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BACKUP_DIR_NAME;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::upload::MemoryUpload;
    use std::fs;
    use tempfile::TempDir;

    fn mock_normalizer(backend: MockBackend) -> Normalizer<MockBackend> {
        Normalizer::with_backend(NormalizerConfig::default(), backend)
    }

    fn write_source(path: &Path, len: usize) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, vec![7u8; len]).unwrap();
    }

    // =========================================================================
    // normalize
    // =========================================================================

    #[test]
    fn default_config_values() {
        let config = NormalizerConfig::default();
        assert_eq!(config.quality.value(), 95);
        assert_eq!(config.max_dimension, 2560);
        assert!(config.backup_enabled);
    }

    #[test]
    fn default_output_swaps_extension() {
        assert_eq!(
            default_output_path(Path::new("/a/b/photo.JPG")),
            PathBuf::from("/a/b/photo.webp")
        );
        assert_eq!(
            default_output_path(Path::new("noext")),
            PathBuf::from("noext.webp")
        );
    }

    #[test]
    fn normalize_reports_sizes_and_default_path() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.jpg");
        write_source(&source, 100);

        let normalizer = mock_normalizer(MockBackend::new());
        let outcome = normalizer.normalize(&source, None);

        assert!(outcome.ok);
        assert_eq!(outcome.original_size, 100);
        assert_eq!(outcome.output_size, b"mock-webp".len() as u64);
        assert_eq!(outcome.output_path, Some(tmp.path().join("hero.webp")));
    }

    #[test]
    fn normalize_passes_config_to_backend() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.jpg");
        let dest = tmp.path().join("out/custom.webp");
        write_source(&source, 10);
        fs::create_dir_all(dest.parent().unwrap()).unwrap();

        let config = NormalizerConfig {
            quality: Quality::new(70),
            max_dimension: 1200,
            backup_enabled: false,
        };
        let normalizer = Normalizer::with_backend(config, MockBackend::new());
        let outcome = normalizer.normalize(&source, Some(&dest));

        assert_eq!(outcome.output_path, Some(dest.clone()));
        let ops = normalizer.backend.get_operations();
        assert_eq!(
            ops,
            vec![RecordedOp::Normalize {
                source: source.to_string_lossy().to_string(),
                output: dest.to_string_lossy().to_string(),
                max_dimension: 1200,
                quality: 70,
            }]
        );
    }

    #[test]
    fn backup_created_once_across_calls() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.jpg");
        write_source(&source, 42);

        let normalizer = mock_normalizer(MockBackend::new());
        assert!(normalizer.normalize(&source, None).ok);
        assert!(normalizer.normalize(&source, None).ok);

        let backups: Vec<_> = fs::read_dir(tmp.path().join(BACKUP_DIR_NAME))
            .unwrap()
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            fs::read(tmp.path().join(BACKUP_DIR_NAME).join("hero.jpg")).unwrap(),
            vec![7u8; 42]
        );
    }

    #[test]
    fn backup_disabled_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("hero.jpg");
        write_source(&source, 42);

        let config = NormalizerConfig {
            backup_enabled: false,
            ..NormalizerConfig::default()
        };
        let normalizer = Normalizer::with_backend(config, MockBackend::new());
        assert!(normalizer.normalize(&source, None).ok);
        assert!(!tmp.path().join(BACKUP_DIR_NAME).exists());
    }

    #[test]
    fn failure_yields_zeroed_outcome() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("corrupt.jpg");
        write_source(&source, 10);

        let normalizer = mock_normalizer(MockBackend::failing_on("corrupt"));
        assert_eq!(normalizer.normalize(&source, None), NormalizeOutcome::failed());
    }

    #[test]
    fn missing_source_is_io_error_from_try_normalize() {
        let tmp = TempDir::new().unwrap();
        let normalizer = mock_normalizer(MockBackend::new());
        let err = normalizer
            .try_normalize(&tmp.path().join("missing.jpg"), None)
            .unwrap_err();
        assert_eq!(err.kind(), "io");
        assert_eq!(normalizer.backend.normalize_count(), 0);
    }

    // =========================================================================
    // normalize_upload
    // =========================================================================

    #[test]
    fn upload_success_reports_reduction() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("uploads/team");
        let upload = MemoryUpload::new("lawyer.jpg", vec![1u8; 90]);

        let normalizer = mock_normalizer(MockBackend::new());
        let outcome = normalizer.normalize_upload(&upload, &folder);

        assert!(outcome.ok);
        // 90 bytes → 9 bytes = 90% reduction
        assert_eq!(
            outcome.message,
            "Image optimized successfully! Reduction: 90.0% as WebP."
        );
        let output = outcome.output_path.unwrap();
        assert_eq!(output.extension().unwrap(), "webp");
        assert!(output.exists());
        let raw = outcome.raw_path.unwrap();
        assert!(raw.file_name().unwrap().to_string_lossy().starts_with("lawyer_"));
        assert_eq!(raw.extension().unwrap(), "jpg");
    }

    #[test]
    fn upload_of_empty_file_reports_zero_percent() {
        let tmp = TempDir::new().unwrap();
        let upload = MemoryUpload::new("empty.png", Vec::new());

        let normalizer = mock_normalizer(MockBackend::new());
        let outcome = normalizer.normalize_upload(&upload, tmp.path());

        assert!(outcome.ok);
        assert!(outcome.message.contains("Reduction: 0.0%"));
    }

    #[test]
    fn upload_failure_keeps_raw_file() {
        let tmp = TempDir::new().unwrap();
        let upload = MemoryUpload::new("corrupt.jpg", b"garbage".to_vec());

        let normalizer = mock_normalizer(MockBackend::failing_on("corrupt"));
        let outcome = normalizer.normalize_upload(&upload, tmp.path());

        assert!(!outcome.ok);
        assert_eq!(outcome.output_path, None);
        assert_eq!(outcome.message, UPLOAD_FAILED_MESSAGE);
        let raw = outcome.raw_path.unwrap();
        assert_eq!(fs::read(raw).unwrap(), b"garbage");
    }

    #[test]
    fn upload_into_unusable_folder_is_unexpected_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();

        let normalizer = mock_normalizer(MockBackend::new());
        let outcome =
            normalizer.normalize_upload(&MemoryUpload::new("a.jpg", vec![1]), &blocker);

        assert!(!outcome.ok);
        assert!(outcome.message.starts_with("Unexpected error"));
        assert_eq!(outcome.raw_path, None);
    }

    #[test]
    fn named_upload_replaces_previous_upload() {
        let tmp = TempDir::new().unwrap();
        let normalizer = mock_normalizer(MockBackend::new());

        let first = normalizer.normalize_upload_as(
            &MemoryUpload::new("old-brand.png", vec![1u8; 30]),
            tmp.path(),
            "site_logo",
        );
        let second = normalizer.normalize_upload_as(
            &MemoryUpload::new("new-brand.png", vec![2u8; 40]),
            tmp.path(),
            "site_logo",
        );

        assert!(first.ok && second.ok);
        assert_eq!(second.output_path, Some(tmp.path().join("site_logo.webp")));
        let raw = second.raw_path.unwrap();
        assert_eq!(raw, tmp.path().join("site_logo.png"));
        assert_eq!(fs::read(raw).unwrap(), vec![2u8; 40]);
    }

    #[test]
    fn named_upload_failure_falls_back_to_raw() {
        let tmp = TempDir::new().unwrap();
        let normalizer = mock_normalizer(MockBackend::failing_on("corrupt"));
        let outcome = normalizer.normalize_upload_as(
            &MemoryUpload::new("x.jpg", b"bytes".to_vec()),
            tmp.path(),
            "corrupt_banner",
        );

        assert!(!outcome.ok);
        assert_eq!(outcome.message, UPLOAD_FAILED_MESSAGE);
        assert_eq!(outcome.raw_path, Some(tmp.path().join("corrupt_banner.jpg")));
    }

    // =========================================================================
    // normalize_directory
    // =========================================================================

    #[test]
    fn directory_failure_isolation() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.jpg", "b.png", "sub/c.JPG", "sub/d.gif"] {
            write_source(&tmp.path().join(name), 50);
        }
        write_source(&tmp.path().join("corrupt.jpg"), 50);

        let normalizer = mock_normalizer(MockBackend::failing_on("corrupt"));
        let report = normalizer.normalize_directory::<&str>(tmp.path(), None, None);

        assert_eq!(report.total_files, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures, vec![tmp.path().join("corrupt.jpg")]);
        assert_eq!(report.original_total_size, 200);
        for file in &report.files {
            assert!(file.output_path.exists());
        }
    }

    #[test]
    fn directory_respects_extension_filter() {
        let tmp = TempDir::new().unwrap();
        write_source(&tmp.path().join("a.jpg"), 5);
        write_source(&tmp.path().join("b.png"), 5);

        let normalizer = mock_normalizer(MockBackend::new());
        let report = normalizer.normalize_directory(tmp.path(), Some([".PNG"].as_slice()), None);

        assert_eq!(report.total_files, 1);
        assert_eq!(report.files[0].input_path, tmp.path().join("b.png"));
    }

    #[test]
    fn directory_streams_events_in_order() {
        let tmp = TempDir::new().unwrap();
        write_source(&tmp.path().join("a.jpg"), 5);
        write_source(&tmp.path().join("z-corrupt.jpg"), 5);

        let (tx, rx) = std::sync::mpsc::channel();
        let normalizer = mock_normalizer(MockBackend::failing_on("corrupt"));
        normalizer.normalize_directory::<&str>(tmp.path(), None, Some(tx));

        let events: Vec<BatchEvent> = rx.iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], BatchEvent::Started { total: 2, .. }));
        assert!(matches!(events[1], BatchEvent::FileNormalized { index: 1, .. }));
        assert!(matches!(events[2], BatchEvent::FileFailed { index: 2, .. }));
        assert!(matches!(
            events[3],
            BatchEvent::Finished {
                succeeded: 1,
                failed: 1
            }
        ));
    }

    #[test]
    fn directory_flags_sources_sharing_an_output() {
        let tmp = TempDir::new().unwrap();
        write_source(&tmp.path().join("logo.jpg"), 5);
        write_source(&tmp.path().join("logo.png"), 5);

        let normalizer = mock_normalizer(MockBackend::new());
        let report = normalizer.normalize_directory::<&str>(tmp.path(), None, None);

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.collisions, vec![tmp.path().join("logo.webp")]);
    }

    #[test]
    fn directory_rerun_skips_backups() {
        let tmp = TempDir::new().unwrap();
        write_source(&tmp.path().join("a.jpg"), 5);

        let normalizer = mock_normalizer(MockBackend::new());
        normalizer.normalize_directory::<&str>(tmp.path(), None, None);
        let second = normalizer.normalize_directory::<&str>(tmp.path(), None, None);

        assert_eq!(second.total_files, 1);
        assert!(!tmp.path().join(BACKUP_DIR_NAME).join(BACKUP_DIR_NAME).exists());
    }
}
