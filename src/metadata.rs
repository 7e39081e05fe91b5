//! Image metadata extraction.
//!
//! Every scanned file gets exactly one [`ImageMetadata`] record. Extraction
//! is a total function: it never fails, it only gets sparser.
//!
//! ## Sources
//!
//! - **Filesystem** (always): file name, extension, size, creation time.
//!   These are read once per file during enumeration as [`FileAttributes`].
//! - **EXIF** (best effort): date taken, camera and lens model, exposure
//!   settings, focal length, pixel dimensions.
//!
//! ## Partial failure
//!
//! Each EXIF field is read independently. A missing tag, a zero denominator
//! or an unparseable date leaves only that field at its fallback; the others
//! are still filled. If the file can't be opened or carries no EXIF at all,
//! the record holds filesystem attributes only, with the same shape as a
//! sparse-but-successful read so display code needs no special case.
//!
//! ## Field formatting
//!
//! | Field | Tag | Format |
//! |---|---|---|
//! | created | `DateTimeOriginal`, then `DateTime` | else filesystem time |
//! | exposure_time | `ExposureTime` | `"2s"`, `"1/250s"` |
//! | f_number | `FNumber` | `"f/2.8"` |
//! | iso_speed | `PhotographicSensitivity` | `"400"` |
//! | camera_model / lens_model | `Model` / `LensModel` | verbatim |
//! | focal_length | `FocalLength` | `"50.0mm"` |
//! | resolution | `PixelXDimension` × `PixelYDimension` | `"6000 x 4000"`, else image header |

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Tag, Value};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;

/// Why a single EXIF field could not be read. Never surfaced to users:
/// the affected field simply stays empty.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),
    #[error("tag {0} not present")]
    Missing(Tag),
    #[error("tag {0} has an unusable value")]
    BadValue(Tag),
}

/// Filesystem facts about one file, read during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttributes {
    pub size: u64,
    pub created: NaiveDateTime,
}

impl FileAttributes {
    /// Read size and creation time.
    ///
    /// Filesystems without a birth time fall back to the modification time.
    pub fn read(path: &Path) -> io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let time = meta.created().or_else(|_| meta.modified())?;
        Ok(Self {
            size: meta.len(),
            created: DateTime::<Local>::from(time).naive_local(),
        })
    }
}

/// Per-file display metadata. Optional fields are empty strings, never absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageMetadata {
    pub file_name: String,
    /// Extension, uppercased, without the dot (`"JPG"`, `"CR2"`).
    pub file_type: String,
    /// EXIF date taken when present and valid, else filesystem creation time.
    pub created: NaiveDateTime,
    pub file_size: u64,
    pub camera_model: String,
    pub lens_model: String,
    pub exposure_time: String,
    pub f_number: String,
    pub iso_speed: String,
    pub focal_length: String,
    pub resolution: String,
}

impl ImageMetadata {
    /// Record built from filesystem attributes alone.
    pub fn from_attributes(path: &Path, attrs: &FileAttributes) -> Self {
        Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_type: path
                .extension()
                .map(|e| e.to_string_lossy().to_uppercase())
                .unwrap_or_default(),
            created: attrs.created,
            file_size: attrs.size,
            camera_model: String::new(),
            lens_model: String::new(),
            exposure_time: String::new(),
            f_number: String::new(),
            iso_speed: String::new(),
            focal_length: String::new(),
            resolution: String::new(),
        }
    }
}

/// Extract metadata for one file. Never fails.
pub fn extract(path: &Path, attrs: &FileAttributes) -> ImageMetadata {
    let mut metadata = ImageMetadata::from_attributes(path, attrs);
    let exif = read_exif(path).ok();

    if let Some(exif) = &exif {
        if let Ok(taken) = date_taken(exif) {
            metadata.created = taken;
        }
        metadata.camera_model = ascii_field(exif, Tag::Model).unwrap_or_default();
        metadata.lens_model = ascii_field(exif, Tag::LensModel).unwrap_or_default();
        metadata.exposure_time = rational_field(exif, Tag::ExposureTime)
            .map(format_exposure_time)
            .unwrap_or_default();
        metadata.f_number = rational_field(exif, Tag::FNumber)
            .map(format_f_number)
            .unwrap_or_default();
        metadata.iso_speed = uint_field(exif, Tag::PhotographicSensitivity)
            .map(|iso| iso.to_string())
            .unwrap_or_default();
        metadata.focal_length = rational_field(exif, Tag::FocalLength)
            .map(format_focal_length)
            .unwrap_or_default();
    }

    metadata.resolution = exif
        .as_ref()
        .and_then(|exif| exif_dimensions(exif).ok())
        .or_else(|| image::image_dimensions(path).ok())
        .map(|(w, h)| format_resolution(w, h))
        .unwrap_or_default();

    metadata
}

/// `"{e}s"` for exposures of a second or longer, `"1/{n}s"` below.
pub fn format_exposure_time(seconds: f64) -> String {
    if seconds >= 1.0 {
        format!("{seconds}s")
    } else {
        format!("1/{}s", (1.0 / seconds).round())
    }
}

pub fn format_f_number(value: f64) -> String {
    format!("f/{value:.1}")
}

pub fn format_focal_length(mm: f64) -> String {
    format!("{mm:.1}mm")
}

pub fn format_resolution(width: u32, height: u32) -> String {
    format!("{width} x {height}")
}

fn read_exif(path: &Path) -> Result<exif::Exif, MetadataError> {
    let file = File::open(path)?;
    Ok(exif::Reader::new().read_from_container(&mut BufReader::new(file))?)
}

fn field(exif: &exif::Exif, tag: Tag) -> Result<&exif::Field, MetadataError> {
    exif.get_field(tag, In::PRIMARY)
        .ok_or(MetadataError::Missing(tag))
}

/// First ASCII component, with NUL padding and whitespace trimmed.
fn ascii_field(exif: &exif::Exif, tag: Tag) -> Result<String, MetadataError> {
    let Value::Ascii(parts) = &field(exif, tag)?.value else {
        return Err(MetadataError::BadValue(tag));
    };
    parts
        .first()
        .map(|bytes| {
            String::from_utf8_lossy(bytes)
                .trim_matches(char::from(0))
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .ok_or(MetadataError::BadValue(tag))
}

/// First rational component as a positive float.
fn rational_field(exif: &exif::Exif, tag: Tag) -> Result<f64, MetadataError> {
    let value = match &field(exif, tag)?.value {
        Value::Rational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        Value::SRational(v) => v.first().filter(|r| r.denom != 0).map(|r| r.to_f64()),
        _ => None,
    };
    value
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or(MetadataError::BadValue(tag))
}

fn uint_field(exif: &exif::Exif, tag: Tag) -> Result<u32, MetadataError> {
    field(exif, tag)?
        .value
        .get_uint(0)
        .ok_or(MetadataError::BadValue(tag))
}

fn exif_dimensions(exif: &exif::Exif) -> Result<(u32, u32), MetadataError> {
    let w = uint_field(exif, Tag::PixelXDimension)?;
    let h = uint_field(exif, Tag::PixelYDimension)?;
    Ok((w, h))
}

/// `DateTimeOriginal` when it parses, else `DateTime`.
fn date_taken(exif: &exif::Exif) -> Result<NaiveDateTime, MetadataError> {
    parse_datetime_field(exif, Tag::DateTimeOriginal)
        .or_else(|_| parse_datetime_field(exif, Tag::DateTime))
}

fn parse_datetime_field(exif: &exif::Exif, tag: Tag) -> Result<NaiveDateTime, MetadataError> {
    let Value::Ascii(parts) = &field(exif, tag)?.value else {
        return Err(MetadataError::BadValue(tag));
    };
    let raw = parts.first().ok_or(MetadataError::BadValue(tag))?;
    let dt = exif::DateTime::from_ascii(raw).map_err(|_| MetadataError::BadValue(tag))?;

    NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())
        .and_then(|d| d.and_hms_opt(dt.hour.into(), dt.minute.into(), dt.second.into()))
        .ok_or(MetadataError::BadValue(tag))
}
