//! RAW-family decoding: embedded preview first, sensor data as fallback.
//!
//! Nearly every RAW container (CR2, NEF, ARW, DNG) carries a camera-rendered
//! JPEG preview, often at full sensor resolution. Both the thumbnail and the
//! full-size paths use it when one decodes.
//!
//! ## Preview location
//!
//! Containers differ in where they point to the preview (IFD0 strips, MakerNote
//! offsets, SubIFDs), so instead of following vendor-specific pointers the
//! file is scanned for JPEG streams. Each SOI marker is validated by walking
//! the JPEG segment structure up to its EOI; this skips false positives inside
//! sensor data and finds the true end of each stream even when compressed
//! data contains `0xFF` bytes. Candidates are tried largest first.
//!
//! Lossless JPEG streams (SOF3 and its hierarchical variants) are sensor
//! tiles, not previews. Tiled DNGs hold many of them, often as large as the
//! real preview, so they are dropped before any decode is attempted.
//!
//! ## Sensor fallback
//!
//! When no preview decodes, `rawloader` reads the sensor data and a 2×2
//! block demosaic produces a half-resolution RGB image with the camera's
//! white balance and a display gamma. That is enough for browsing; it is not
//! a RAW development pipeline.

use super::backend::DecodeError;
use super::decoded::ImageSource;
use super::orientation::{Orientation, orientation_from_bytes};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::ops::Range;
use std::path::Path;

/// How many lossy JPEG candidates to try before giving up on previews.
const MAX_PREVIEW_ATTEMPTS: usize = 4;

/// Display gamma applied to linear sensor values.
const DISPLAY_GAMMA: f32 = 1.0 / 2.2;

/// Decoded RAW pixels plus the metadata the caller needs to normalize them.
pub(crate) struct RawDecode {
    pub image: DynamicImage,
    pub orientation: Orientation,
    pub source: ImageSource,
}

/// Decode a RAW file, preferring its embedded preview.
pub(crate) fn decode_raw(path: &Path) -> Result<RawDecode, DecodeError> {
    let data = std::fs::read(path).map_err(|source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // The container's IFD0 is authoritative; previews rarely carry their own tag.
    let container_orientation = orientation_from_bytes(&data);

    if let Some((image, preview_orientation)) = decode_embedded_preview(&data) {
        return Ok(RawDecode {
            image,
            orientation: container_orientation
                .or(preview_orientation)
                .unwrap_or_default(),
            source: ImageSource::EmbeddedPreview,
        });
    }

    let image = decode_sensor(path)?;
    Ok(RawDecode {
        image,
        orientation: container_orientation.unwrap_or_default(),
        source: ImageSource::RawSensor,
    })
}

/// Decode the largest embedded JPEG that actually decodes.
fn decode_embedded_preview(data: &[u8]) -> Option<(DynamicImage, Option<Orientation>)> {
    let mut candidates = find_embedded_jpegs(data);
    candidates.sort_by_key(|range| std::cmp::Reverse(range.len()));

    candidates
        .into_iter()
        .filter(|range| !is_lossless(&data[range.clone()]))
        .take(MAX_PREVIEW_ATTEMPTS)
        .find_map(|range| {
            let bytes = &data[range];
            let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).ok()?;
            Some((image, orientation_from_bytes(bytes)))
        })
}

/// Byte ranges of structurally complete JPEG streams embedded in `data`.
pub(crate) fn find_embedded_jpegs(data: &[u8]) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = find_soi(&data[pos..]) {
        let start = pos + offset;
        match jpeg_stream_end(data, start) {
            Some(end) => {
                found.push(start..end);
                pos = end;
            }
            None => pos = start + 2,
        }
    }

    found
}

/// The start-of-frame marker of a stream found by [`find_embedded_jpegs`].
fn frame_marker(stream: &[u8]) -> Option<u8> {
    let mut pos = 2;
    loop {
        if *stream.get(pos)? != 0xFF {
            return None;
        }
        while *stream.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *stream.get(pos + 1)?;
        pos += 2;

        match marker {
            // DHT, JPG and DAC share the range but are not frames.
            0xC4 | 0xC8 | 0xCC => pos += segment_len(stream, pos)?,
            0xC0..=0xCF => return Some(marker),
            0xD9 | 0xDA => return None,
            0x01 | 0xD0..=0xD7 => {}
            _ => pos += segment_len(stream, pos)?,
        }
    }
}

fn is_lossless(stream: &[u8]) -> bool {
    matches!(frame_marker(stream), Some(0xC3 | 0xC7 | 0xCB | 0xCF))
}

/// SOI followed by the first byte of the next marker.
fn find_soi(data: &[u8]) -> Option<usize> {
    data.windows(3).position(|w| w == [0xFF, 0xD8, 0xFF])
}

/// Walk the marker segments of the stream whose SOI is at `start` and return
/// the offset one past its EOI marker, or `None` if the structure breaks.
fn jpeg_stream_end(data: &[u8], start: usize) -> Option<usize> {
    let mut pos = start + 2;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        // Fill bytes may pad before a marker.
        while *data.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos + 1)?;
        pos += 2;

        match marker {
            0xD9 => return Some(pos),
            0x00 => return None,
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => {}
            0xDA => {
                pos += segment_len(data, pos)?;
                pos = next_marker_after_scan(data, pos)?;
            }
            _ => pos += segment_len(data, pos)?,
        }
    }
}

/// Big-endian segment length at `pos`, including the two length bytes.
fn segment_len(data: &[u8], pos: usize) -> Option<usize> {
    let len = u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as usize;
    (len >= 2).then_some(len)
}

/// Skip entropy-coded scan data up to the next real marker.
///
/// Inside a scan `0xFF 0x00` is a stuffed literal and `0xFF 0xD0..D7` are
/// restart markers; neither ends the scan.
fn next_marker_after_scan(data: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        pos += data.get(pos..)?.iter().position(|&b| b == 0xFF)?;
        match *data.get(pos + 1)? {
            0x00 | 0xD0..=0xD7 | 0xFF => pos += 1,
            _ => return Some(pos),
        }
    }
}

/// Full sensor decode through `rawloader`, demosaiced at half resolution.
fn decode_sensor(path: &Path) -> Result<DynamicImage, DecodeError> {
    let raw = rawloader::decode_file(path).map_err(|e| DecodeError::Format {
        path: path.to_path_buf(),
        reason: format!("no usable preview and RAW decode failed: {e:?}"),
    })?;

    let samples = normalized_samples(&raw);
    let wb = white_balance(&raw.wb_coeffs);

    let rgb = if raw.cpp == 3 {
        linear_rgb_to_image(&samples, raw.width, raw.height, wb)
    } else {
        demosaic_half(&samples, raw.width, raw.height, wb, |row, col| {
            raw.cfa.color_at(row, col)
        })
    };

    rgb.map(DynamicImage::ImageRgb8)
        .ok_or_else(|| DecodeError::Empty(path.to_path_buf()))
}

/// Sensor values scaled to `0.0..=1.0` between the black and white levels.
fn normalized_samples(raw: &rawloader::RawImage) -> Vec<f32> {
    match &raw.data {
        rawloader::RawImageData::Integer(values) => {
            let black = raw.blacklevels[0] as f32;
            let range = (raw.whitelevels[0] as f32 - black).max(1.0);
            values
                .iter()
                .map(|&v| ((v as f32 - black) / range).clamp(0.0, 1.0))
                .collect()
        }
        rawloader::RawImageData::Float(values) => {
            values.iter().map(|v| v.clamp(0.0, 1.0)).collect()
        }
    }
}

/// As-shot white balance normalized to green. Missing coefficients are neutral.
fn white_balance(coeffs: &[f32; 4]) -> [f32; 3] {
    let sane = |v: f32| if v.is_finite() && v > 0.0 { v } else { 1.0 };
    let green = sane(coeffs[1]);
    [sane(coeffs[0]) / green, 1.0, sane(coeffs[2]) / green]
}

fn to_display(v: f32) -> u8 {
    (v.clamp(0.0, 1.0).powf(DISPLAY_GAMMA) * 255.0).round() as u8
}

/// Average each 2×2 CFA block into one RGB pixel.
///
/// `color_at` returns the CFA channel (0 = red, 1/3 = green, 2 = blue).
fn demosaic_half(
    samples: &[f32],
    width: usize,
    height: usize,
    wb: [f32; 3],
    color_at: impl Fn(usize, usize) -> usize,
) -> Option<RgbImage> {
    let (out_w, out_h) = (width / 2, height / 2);
    if out_w == 0 || out_h == 0 || samples.len() < width * height {
        return None;
    }

    let mut out = Vec::with_capacity(out_w * out_h * 3);
    for by in 0..out_h {
        for bx in 0..out_w {
            let mut sums = [0.0f32; 3];
            let mut counts = [0u32; 3];
            for (dy, dx) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let (row, col) = (by * 2 + dy, bx * 2 + dx);
                let channel = match color_at(row, col) {
                    0 => 0,
                    2 => 2,
                    _ => 1,
                };
                sums[channel] += samples[row * width + col];
                counts[channel] += 1;
            }
            for c in 0..3 {
                let mean = if counts[c] == 0 {
                    0.0
                } else {
                    sums[c] / counts[c] as f32
                };
                out.push(to_display(mean * wb[c]));
            }
        }
    }

    RgbImage::from_raw(out_w as u32, out_h as u32, out)
}

/// Three-samples-per-pixel data (linear DNG) needs no demosaic.
fn linear_rgb_to_image(samples: &[f32], width: usize, height: usize, wb: [f32; 3]) -> Option<RgbImage> {
    if width == 0 || height == 0 || samples.len() < width * height * 3 {
        return None;
    }
    let out = samples[..width * height * 3]
        .chunks_exact(3)
        .flat_map(|px| [to_display(px[0] * wb[0]), to_display(px[1] * wb[1]), to_display(px[2] * wb[2])])
        .collect();
    RgbImage::from_raw(width as u32, height as u32, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{fake_raw_with_orientation, fake_raw_with_preview, jpeg_bytes};

    /// A structurally valid lossless (SOF3) stream with `scan_len` bytes of
    /// scan data. `image` cannot decode it.
    fn lossless_tile(scan_len: usize) -> Vec<u8> {
        let mut tile = vec![0xFF, 0xD8];
        tile.extend_from_slice(&[0xFF, 0xC3, 0x00, 0x0B, 16, 0, 16, 0, 16, 1, 1, 0x11, 0]);
        tile.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 1, 1, 0, 1, 0, 0]);
        tile.extend(vec![0x11; scan_len]);
        tile.extend_from_slice(&[0xFF, 0xD9]);
        tile
    }

    fn decode_fixture(name: &str, bytes: Vec<u8>) -> RawDecode {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        decode_raw(&path).unwrap()
    }

    #[test]
    fn finds_single_embedded_jpeg() {
        let jpeg = jpeg_bytes(32, 24);
        let mut data = b"II*\0garbage-header".to_vec();
        let start = data.len();
        data.extend_from_slice(&jpeg);
        data.extend_from_slice(&[0u8; 64]);

        let found = find_embedded_jpegs(&data);
        assert_eq!(found, vec![start..start + jpeg.len()]);
    }

    #[test]
    fn finds_multiple_jpegs_in_order() {
        let small = jpeg_bytes(8, 8);
        let large = jpeg_bytes(64, 48);
        let mut data = vec![0u8; 16];
        data.extend_from_slice(&small);
        data.extend_from_slice(&[0xAB; 32]);
        data.extend_from_slice(&large);

        let found = find_embedded_jpegs(&data);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].len(), small.len());
        assert_eq!(found[1].len(), large.len());
    }

    #[test]
    fn truncated_jpeg_is_not_a_candidate() {
        let jpeg = jpeg_bytes(32, 24);
        let truncated = &jpeg[..jpeg.len() / 2];
        assert!(find_embedded_jpegs(truncated).is_empty());
    }

    #[test]
    fn stray_soi_in_sensor_noise_is_skipped() {
        let mut data = vec![0x12, 0xFF, 0xD8, 0xFF, 0x00, 0x00, 0x34];
        let jpeg = jpeg_bytes(16, 16);
        let start = data.len();
        data.extend_from_slice(&jpeg);

        assert_eq!(find_embedded_jpegs(&data), vec![start..start + jpeg.len()]);
    }

    #[test]
    fn frame_marker_tells_lossless_from_baseline() {
        let tile = lossless_tile(64);
        assert_eq!(frame_marker(&tile), Some(0xC3));
        assert!(is_lossless(&tile));

        let preview = jpeg_bytes(16, 12);
        assert!(!is_lossless(&preview));
    }

    #[test]
    fn lossless_tiles_do_not_use_up_preview_attempts() {
        let mut data = vec![0u8; 16];
        for _ in 0..MAX_PREVIEW_ATTEMPTS + 2 {
            data.extend_from_slice(&lossless_tile(8192));
        }
        let preview = jpeg_bytes(16, 12);
        assert!(preview.len() < 8192);
        data.extend_from_slice(&preview);

        assert_eq!(find_embedded_jpegs(&data).len(), MAX_PREVIEW_ATTEMPTS + 3);
        let (image, _) = decode_embedded_preview(&data).unwrap();
        assert_eq!((image.width(), image.height()), (16, 12));
    }

    #[test]
    fn no_jpeg_in_plain_bytes() {
        assert!(find_embedded_jpegs(&[0u8; 1024]).is_empty());
    }

    #[test]
    fn decode_raw_prefers_largest_preview() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("IMG_0001.CR2");
        std::fs::write(&path, fake_raw_with_preview(&[(16, 12), (80, 60)])).unwrap();

        let decoded = decode_raw(&path).unwrap();
        assert_eq!(decoded.source, ImageSource::EmbeddedPreview);
        assert_eq!((decoded.image.width(), decoded.image.height()), (80, 60));
    }

    #[test]
    fn container_orientation_wins_over_preview_tag() {
        let decoded = decode_fixture("IMG_0002.CR2", fake_raw_with_orientation(Some(6), Some(3)));
        assert_eq!(decoded.source, ImageSource::EmbeddedPreview);
        assert_eq!(decoded.orientation, Orientation::Rotate90);
    }

    #[test]
    fn preview_orientation_used_when_container_has_none() {
        let decoded = decode_fixture("DSC_0003.NEF", fake_raw_with_orientation(None, Some(8)));
        assert_eq!(decoded.orientation, Orientation::Rotate270);
    }

    #[test]
    fn decode_raw_without_preview_falls_back_and_fails_cleanly() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.nef");
        std::fs::write(&path, vec![0x42u8; 4096]).unwrap();

        let err = decode_raw(&path).err().expect("garbage must not decode");
        assert!(matches!(err, DecodeError::Format { .. }));
    }

    #[test]
    fn demosaic_rggb_block() {
        // One RGGB block: R=1.0, G=0.25/0.25, B=0.0
        let samples = [1.0, 0.25, 0.25, 0.0];
        let rggb = |row: usize, col: usize| match (row % 2, col % 2) {
            (0, 0) => 0,
            (1, 1) => 2,
            _ => 1,
        };
        let img = demosaic_half(&samples, 2, 2, [1.0, 1.0, 1.0], rggb).unwrap();

        assert_eq!(img.dimensions(), (1, 1));
        let px = img.get_pixel(0, 0).0;
        assert_eq!(px[0], 255);
        assert_eq!(px[1], to_display(0.25));
        assert_eq!(px[2], 0);
    }

    #[test]
    fn demosaic_rejects_single_row_sensor() {
        assert!(demosaic_half(&[0.5, 0.5], 2, 1, [1.0; 3], |_, _| 1).is_none());
    }

    #[test]
    fn linear_rgb_maps_three_samples_per_pixel() {
        let samples = [1.0, 0.0, 0.25, 0.0, 1.0, 0.0];
        let img = linear_rgb_to_image(&samples, 2, 1, [1.0, 1.0, 2.0]).unwrap();

        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, to_display(0.5)]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 0]);
    }

    #[test]
    fn linear_rgb_rejects_short_buffer() {
        assert!(linear_rgb_to_image(&[0.5; 5], 2, 1, [1.0; 3]).is_none());
        assert!(linear_rgb_to_image(&[], 0, 0, [1.0; 3]).is_none());
    }

    #[test]
    fn white_balance_normalizes_to_green() {
        assert_eq!(white_balance(&[2.0, 1.0, 1.5, f32::NAN]), [2.0, 1.0, 1.5]);
        assert_eq!(white_balance(&[4.0, 2.0, 3.0, 2.0]), [2.0, 1.0, 1.5]);
    }

    #[test]
    fn white_balance_missing_is_neutral() {
        assert_eq!(white_balance(&[f32::NAN; 4]), [1.0, 1.0, 1.0]);
    }
}
