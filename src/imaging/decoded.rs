//! The normalized bitmap every decode path converges on.

use super::orientation::Orientation;
use image::{DynamicImage, RgbaImage};
use serde::Serialize;

/// Which decode path produced the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    /// Standard format decoded directly.
    Decoded,
    /// JPEG preview embedded in a RAW container.
    EmbeddedPreview,
    /// Demosaiced RAW sensor data.
    RawSensor,
}

/// An owned, immutable RGBA8 bitmap.
///
/// Orientation correction and any user rotation are already baked into the
/// pixels; the tags only record what was applied. Rotating yields a new
/// value, the original is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pixels: RgbaImage,
    orientation: Orientation,
    rotation: u16,
    source: ImageSource,
}

impl DecodedImage {
    /// Wrap decoded pixels. Returns `None` for a zero-sized bitmap.
    pub fn new(image: DynamicImage, orientation: Orientation, source: ImageSource) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self {
            pixels: image.into_rgba8(),
            orientation,
            rotation: 0,
            source,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.as_raw().len()
    }

    /// Orientation correction applied at decode time.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Clockwise user rotation in degrees (0, 90, 180 or 270).
    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn source(&self) -> ImageSource {
        self.source
    }

    /// A copy rotated a further 90° clockwise.
    pub fn rotated_clockwise(&self) -> Self {
        Self {
            pixels: image::imageops::rotate90(&self.pixels),
            orientation: self.orientation,
            rotation: (self.rotation + 90) % 360,
            source: self.source,
        }
    }

    /// Convert back to a `DynamicImage` for encoding.
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.pixels.clone())
    }
}
