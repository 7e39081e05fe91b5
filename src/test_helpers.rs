//! Shared test utilities for the filmstrip test suite.
//!
//! Provides synthetic image builders: plain JPEGs, JPEGs with a hand-built
//! EXIF block, and byte blobs that look enough like a RAW container for the
//! embedded-preview scanner.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let exif = ExifFields {
//!     orientation: Some(6),
//!     model: Some("X100V"),
//!     ..Default::default()
//! };
//! std::fs::write(&path, jpeg_bytes_with_exif(160, 80, &exif)).unwrap();
//! ```

use image::{ImageEncoder, Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// Pixel data
// =========================================================================

/// An RGBA image where every pixel is distinct enough to track transforms.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
            255,
        ])
    })
}

// =========================================================================
// JPEG files
// =========================================================================

/// Encode a small valid baseline JPEG in memory.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Create a small valid JPEG file with the given dimensions.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, jpeg_bytes(width, height)).unwrap();
}

/// Write one file per name into `dir`: real JPEG/PNG data for standard
/// extensions, a fake RAW container for RAW extensions, text for the rest.
pub fn populate_dir(dir: &Path, names: &[&str]) {
    for name in names {
        let path = dir.join(name);
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => write_jpeg(&path, 64, 48),
            "png" => RgbaImage::new(64, 48)
                .save_with_format(&path, image::ImageFormat::Png)
                .unwrap(),
            "raw" | "nef" | "cr2" | "arw" | "dng" => {
                std::fs::write(&path, fake_raw_with_preview(&[(64, 48)])).unwrap()
            }
            _ => std::fs::write(&path, "not an image").unwrap(),
        }
    }
}

// =========================================================================
// EXIF
// =========================================================================

/// Tags to embed with [`jpeg_bytes_with_exif`]. `None` omits the tag.
#[derive(Debug, Clone, Default)]
pub struct ExifFields {
    pub orientation: Option<u16>,
    pub model: Option<&'static str>,
    pub lens_model: Option<&'static str>,
    /// `DateTimeOriginal`, `"YYYY:MM:DD HH:MM:SS"`.
    pub date_taken: Option<&'static str>,
    /// IFD0 `DateTime`.
    pub date_modified: Option<&'static str>,
    pub exposure_time: Option<(u32, u32)>,
    pub f_number: Option<(u32, u32)>,
    pub iso: Option<u16>,
    pub focal_length: Option<(u32, u32)>,
    pub pixel_dimensions: Option<(u32, u32)>,
}

const ASCII: u16 = 2;
const SHORT: u16 = 3;
const LONG: u16 = 4;
const RATIONAL: u16 = 5;

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

fn ascii(tag: u16, s: &str) -> Entry {
    let mut data = s.as_bytes().to_vec();
    data.push(0);
    Entry {
        tag,
        kind: ASCII,
        count: data.len() as u32,
        data,
    }
}

fn short(tag: u16, v: u16) -> Entry {
    Entry {
        tag,
        kind: SHORT,
        count: 1,
        data: v.to_le_bytes().to_vec(),
    }
}

fn long(tag: u16, v: u32) -> Entry {
    Entry {
        tag,
        kind: LONG,
        count: 1,
        data: v.to_le_bytes().to_vec(),
    }
}

fn rational(tag: u16, (num, den): (u32, u32)) -> Entry {
    let mut data = num.to_le_bytes().to_vec();
    data.extend_from_slice(&den.to_le_bytes());
    Entry {
        tag,
        kind: RATIONAL,
        count: 1,
        data,
    }
}

fn ifd_size(entries: usize) -> usize {
    2 + 12 * entries + 4
}

fn write_ifd(out: &mut Vec<u8>, entries: &[Entry], data_start: usize, data: &mut Vec<u8>) {
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for e in entries {
        out.extend_from_slice(&e.tag.to_le_bytes());
        out.extend_from_slice(&e.kind.to_le_bytes());
        out.extend_from_slice(&e.count.to_le_bytes());
        if e.data.len() <= 4 {
            let mut inline = e.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&((data_start + data.len()) as u32).to_le_bytes());
            data.extend_from_slice(&e.data);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
}

/// Little-endian TIFF structure holding IFD0 and, when needed, an Exif IFD.
fn tiff_block(fields: &ExifFields) -> Vec<u8> {
    let mut ifd0 = Vec::new();
    if let Some(model) = fields.model {
        ifd0.push(ascii(0x0110, model));
    }
    if let Some(o) = fields.orientation {
        ifd0.push(short(0x0112, o));
    }
    if let Some(dt) = fields.date_modified {
        ifd0.push(ascii(0x0132, dt));
    }

    let mut exif = Vec::new();
    if let Some(v) = fields.exposure_time {
        exif.push(rational(0x829A, v));
    }
    if let Some(v) = fields.f_number {
        exif.push(rational(0x829D, v));
    }
    if let Some(iso) = fields.iso {
        exif.push(short(0x8827, iso));
    }
    if let Some(dt) = fields.date_taken {
        exif.push(ascii(0x9003, dt));
    }
    if let Some(v) = fields.focal_length {
        exif.push(rational(0x920A, v));
    }
    if let Some((w, h)) = fields.pixel_dimensions {
        exif.push(long(0xA002, w));
        exif.push(long(0xA003, h));
    }
    if let Some(lens) = fields.lens_model {
        exif.push(ascii(0xA434, lens));
    }

    let has_exif = !exif.is_empty();
    let exif_offset = 8 + ifd_size(ifd0.len() + usize::from(has_exif));
    if has_exif {
        ifd0.push(long(0x8769, exif_offset as u32));
    }
    ifd0.sort_by_key(|e| e.tag);
    exif.sort_by_key(|e| e.tag);

    let data_start = if has_exif {
        exif_offset + ifd_size(exif.len())
    } else {
        exif_offset
    };

    let mut out = b"II".to_vec();
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    let mut data = Vec::new();
    write_ifd(&mut out, &ifd0, data_start, &mut data);
    if has_exif {
        write_ifd(&mut out, &exif, data_start, &mut data);
    }
    out.extend_from_slice(&data);
    out
}

/// A JPEG with an APP1 `Exif` segment inserted right after SOI.
pub fn jpeg_bytes_with_exif(width: u32, height: u32, fields: &ExifFields) -> Vec<u8> {
    let jpeg = jpeg_bytes(width, height);
    let tiff = tiff_block(fields);
    let segment_len = (2 + 6 + tiff.len()) as u16;

    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// =========================================================================
// RAW containers
// =========================================================================

/// Bytes shaped like a RAW file: a minimal TIFF header, then one embedded
/// JPEG per entry in `previews`, separated by filler that contains no
/// markers.
pub fn fake_raw_with_preview(previews: &[(u32, u32)]) -> Vec<u8> {
    let mut out = b"II".to_vec();
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 32]);
    for &(w, h) in previews {
        out.extend_from_slice(&jpeg_bytes(w, h));
        out.extend_from_slice(&[0x55; 64]);
    }
    out
}

/// A RAW-shaped file with one 40x30 preview. `container` goes into the
/// outer TIFF's IFD0, `preview` into the preview's own APP1 block.
pub fn fake_raw_with_orientation(container: Option<u16>, preview: Option<u16>) -> Vec<u8> {
    let mut out = tiff_block(&ExifFields {
        orientation: container,
        ..Default::default()
    });
    out.extend_from_slice(&[0u8; 32]);
    let jpeg = match preview {
        Some(o) => jpeg_bytes_with_exif(
            40,
            30,
            &ExifFields {
                orientation: Some(o),
                ..Default::default()
            },
        ),
        None => jpeg_bytes(40, 30),
    };
    out.extend_from_slice(&jpeg);
    out.extend_from_slice(&[0x55; 64]);
    out
}
