//! Pure Rust decode + libwebp encode backend.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, BMP, TIFF, WebP) | `image` crate decoders, format sniffed from bytes |
//! | Orientation | `kamadak-exif` tag read + `DynamicImage` rotate/flip |
//! | Flatten | alpha composited over white, everything else promoted to RGB8 |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → WebP | `webp::Encoder::encode_advanced` (lossy, method 6, exact off) |
//!
//! Outputs are written to a `.part` sibling and renamed into place, so a
//! failed encode or write never leaves a truncated file at the destination.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::bounded_dimensions;
use super::orientation::{apply_orientation, read_exif_orientation};
use super::params::{NormalizeParams, Quality};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use std::ffi::OsString;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Extension of every normalized output.
pub const OUTPUT_EXTENSION: &str = "webp";

/// libwebp's slowest, most thorough effort level.
const WEBP_METHOD: i32 = 6;

/// Production backend.
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode raw bytes, sniffing the container rather than trusting the extension.
fn decode_image(path: &Path, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::decode(path, e))
}

/// Collapse any color model to opaque RGB8.
///
/// Alpha is composited over solid white; palette and grayscale sources (which
/// the decoders already expand) are promoted channel-wise.
fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return match img {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let over_white = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

/// Encode as lossy WebP at the given quality.
fn encode_webp(rgb: &RgbImage, quality: Quality, output: &Path) -> Result<Vec<u8>, BackendError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| BackendError::encode(output, "libwebp rejected the default config"))?;
    config.lossless = 0;
    config.quality = quality.value() as f32;
    config.method = WEBP_METHOD;
    config.exact = 0;

    let encoder = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height());
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| BackendError::encode(output, format!("{e:?}")))?;
    Ok(memory.to_vec())
}

fn partial_path(path: &Path) -> Result<PathBuf, BackendError> {
    let name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("output path has no file name: {}", path.display()),
        )
    })?;
    let mut partial = OsString::from(name);
    partial.push(".part");
    Ok(path.with_file_name(partial))
}

/// Write via a `.part` sibling and rename into place.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    let partial = partial_path(path)?;
    let result = std::fs::write(&partial, bytes).and_then(|()| std::fs::rename(&partial, path));
    if let Err(e) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(BackendError::Io(e));
    }
    Ok(())
}

impl ImageBackend for RustBackend {
    fn normalize(&self, params: &NormalizeParams) -> Result<Dimensions, BackendError> {
        let bytes = std::fs::read(&params.source)?;
        let decoded = decode_image(&params.source, &bytes)?;

        let oriented = apply_orientation(decoded, read_exif_orientation(&bytes));
        let rgb = flatten_to_rgb(oriented);

        let bounded = match bounded_dimensions(rgb.dimensions(), params.max_dimension) {
            Some((width, height)) => {
                tracing::debug!(
                    source = %params.source.display(),
                    from = ?rgb.dimensions(),
                    to = ?(width, height),
                    "resizing to bound"
                );
                image::imageops::resize(&rgb, width, height, FilterType::Lanczos3)
            }
            None => rgb,
        };

        let encoded = encode_webp(&bounded, params.quality, &params.output)?;
        write_atomically(&params.output, &encoded)?;

        Ok(Dimensions {
            width: bounded.width(),
            height: bounded.height(),
        })
    }
}
