//! # imgnorm
//!
//! Turns arbitrary uploaded or on-disk raster images into consistent web
//! derivatives: orientation baked in, opaque RGB, longer edge bounded, lossy
//! WebP. The raw source can be snapshotted into a sibling `originals/`
//! directory first.
//!
//! # Pipeline
//!
//! ```text
//! source ─▶ backup? ─▶ decode ─▶ orient ─▶ flatten ─▶ bound ─▶ encode ─▶ .webp
//!           originals/            EXIF      on white    Lanczos3  method 6
//! ```
//!
//! Everything runs synchronously on the calling thread. Failures never
//! propagate out of the three public operations on
//! [`Normalizer`](normalize::Normalizer); they are logged through `tracing`
//! and folded into outcome values so one bad file cannot stop a batch or an
//! upload handler.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`normalize`] | `Normalizer`: single file, upload, and directory entry points |
//! | [`imaging`] | Decode/orient/flatten/resize/encode behind the `ImageBackend` trait |
//! | [`backup`] | Idempotent `originals/` snapshot of each source |
//! | [`upload`] | Uploaded-file contract and collision-resistant staging names |
//! | [`batch`] | Batch report, per-file report, progress events |
//! | [`scan`] | Recursive, case-insensitive image discovery |
//! | [`config`] | `imgnorm.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Example
//!
//! ```no_run
//! use imgnorm::normalize::{Normalizer, NormalizerConfig};
//! use std::path::Path;
//!
//! let normalizer = Normalizer::new(NormalizerConfig::default());
//! let outcome = normalizer.normalize(Path::new("static/img/hero.jpg"), None);
//! if outcome.ok {
//!     println!("wrote {:?}", outcome.output_path);
//! }
//! ```

pub mod backup;
pub mod batch;
pub mod config;
pub mod imaging;
pub mod normalize;
pub mod output;
pub mod scan;
pub mod upload;
