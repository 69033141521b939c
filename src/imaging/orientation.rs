//! EXIF orientation handling.
//!
//! Phone cameras store pixels in sensor order and record the intended
//! rotation in EXIF tag `0x0112`. The normalizer bakes that transform into
//! the pixel data and never re-embeds the tag, so outputs display correctly
//! without any metadata.
//!
//! EXIF orientation values:
//! 1 = Normal, 2 = Mirrored, 3 = 180°, 4 = Flipped V,
//! 5 = Mirrored + 90° CW, 6 = 90° CW, 7 = Mirrored + 270° CW, 8 = 270° CW

use image::DynamicImage;
use std::io::Cursor;

/// Read the EXIF orientation tag from raw image bytes.
///
/// Returns 1 (normal) when there is no EXIF block, the tag is absent, or the
/// container is not one `kamadak-exif` understands.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 1,
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation value to the pixel data.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
