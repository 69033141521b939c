//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the single operation every backend must
//! support: turning one source file into one normalized output.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): `image` decodes and
//! resamples, `kamadak-exif` reads orientation, libwebp encodes.

use super::params::NormalizeParams;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a single backend operation.
///
/// The three kinds are kept apart so logs can tell a corrupt upload from a
/// full disk, even though callers of the public normalizer only ever see a
/// uniform failure outcome.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },
}

impl BackendError {
    pub fn decode(path: &Path, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(path: &Path, reason: impl ToString) -> Self {
        Self::Encode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
        }
    }
}

/// Pixel size of a written output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Keeps the [`Normalizer`](crate::normalize::Normalizer) independent of the
/// codec stack so it can be exercised with a mock.
pub trait ImageBackend {
    /// Decode, orient, flatten, bound and encode `params.source` into
    /// `params.output`. Returns the dimensions of the written image.
    ///
    /// Must not leave a partial file at `params.output` on failure.
    fn normalize(&self, params: &NormalizeParams) -> Result<Dimensions, BackendError>;
}
