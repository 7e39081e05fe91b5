//! Pure Rust decoding backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, BMP) | `image::ImageReader` with format sniffing |
//! | Decode (RAW preview) | embedded JPEG scan, then `image` |
//! | Decode (RAW sensor) | `rawloader` + half-resolution demosaic |
//! | Orientation | `kamadak-exif` tag 0x0112 |
//! | Downscale | `DynamicImage::thumbnail_exact` |
//! | Metadata | [`crate::metadata::extract`] |
//!
//! Downscaling happens before the orientation transform, so rotating a
//! thumbnail touches only thumbnail-sized pixels. The width bound applies to
//! the *displayed* orientation: a portrait photo stored landscape with
//! orientation 6 is bounded on its short sensor axis.

use super::backend::{DecodeError, ImageBackend};
use super::calculations::calculate_scaled_dimensions;
use super::decoded::{DecodedImage, ImageSource};
use super::orientation::{Orientation, read_orientation};
use super::raw;
use crate::metadata::{self, FileAttributes, ImageMetadata};
use crate::types::FormatFamily;
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
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

/// Load and decode a standard-format image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, DecodeError> {
    let io_err = |source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    };
    ImageReader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(|e| DecodeError::Format {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Shrink `image` so that, once `orientation` is applied, it is at most
/// `max_width` wide.
fn downscale(image: DynamicImage, orientation: Orientation, max_width: u32) -> DynamicImage {
    let stored = (image.width(), image.height());
    let displayed = if orientation.swaps_axes() {
        (stored.1, stored.0)
    } else {
        stored
    };

    match calculate_scaled_dimensions(displayed, max_width) {
        Some((w, h)) if orientation.swaps_axes() => image.thumbnail_exact(h, w),
        Some((w, h)) => image.thumbnail_exact(w, h),
        None => image,
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path, max_width: u32) -> Result<DecodedImage, DecodeError> {
        let family = FormatFamily::from_path(path)
            .ok_or_else(|| DecodeError::Unsupported(path.to_path_buf()))?;

        let (image, orientation, source) = match family {
            FormatFamily::Standard => {
                let image = load_image(path)?;
                let orientation = read_orientation(path).unwrap_or_default();
                (image, orientation, ImageSource::Decoded)
            }
            FormatFamily::Raw => {
                let decoded = raw::decode_raw(path)?;
                (decoded.image, decoded.orientation, decoded.source)
            }
        };

        let image = orientation.apply(downscale(image, orientation, max_width));
        DecodedImage::new(image, orientation, source)
            .ok_or_else(|| DecodeError::Empty(path.to_path_buf()))
    }

    fn read_metadata(&self, path: &Path, attrs: &FileAttributes) -> ImageMetadata {
        metadata::extract(path, attrs)
    }
}
