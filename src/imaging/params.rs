//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`Normalizer`](crate::normalize::Normalizer) (which
//! decides where outputs go and whether to back up) and the
//! [`backend`](super::backend) (which does the pixel work). Keeping them apart
//! lets tests drive the normalizer with a mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: lossy encoding quality (0-100, default 95), clamped on construction.
//! - [`NormalizeParams`]: one normalization job, i.e. source, output path,
//!   longer-edge bound and quality.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Quality setting for lossy image encoding (0-100).
///
/// Higher values produce larger files with less loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Parameters for a single normalize operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Upper bound on the longer edge of the output.
    pub max_dimension: u32,
    pub quality: Quality,
}
