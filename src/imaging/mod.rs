//! Image processing: decode, orient, flatten, bound, encode.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode** | `image` decoders, format sniffed from the bytes |
//! | **Orientation** | `kamadak-exif` (tag `0x0112`) |
//! | **Resize** | Lanczos3 via `image::imageops::resize` |
//! | **Encode** | lossy WebP via `webp` (libwebp), method 6 |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and size math (unit testable)
//! - **Parameters**: Data structures describing a normalization
//! - **Orientation**: EXIF tag reading and pixel transforms
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod orientation;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{bounded_dimensions, reduction_percent};
pub use params::{NormalizeParams, Quality};
pub use rust_backend::{OUTPUT_EXTENSION, RustBackend};
