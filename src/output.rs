//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Images in /photos/trip (2)
//! 001 a.jpg
//!     Resolution: 6000 x 4000
//!     Camera: Canon EOS R5
//!     Exposure: 1/250s
//!     File size: 4.21 MB
//!     Created: 2023-07-14 18:30:05
//! 002 b.cr2 [selected]
//!     Thumbnail: failed
//!     File size: 24 MB
//!     Created: 2023-07-14 18:31:10
//!
//! Cache: 2 decoded
//! ```
//!
//! ## Progress events
//!
//! ```text
//! Scanning /photos/trip (2 images)
//!     a.jpg: 120x80 (decoded)
//!     b.cr2: failed (failed to decode ...)
//! ```
//!
//! ## Export
//!
//! ```text
//! Exported 2 files (28.21 MB) to /backup
//!     a.jpg
//!     b.cr2
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::browser::BrowserEvent;
use crate::cache::CacheStats;
use crate::imaging::{DecodedImage, ImageSource};
use crate::metadata::ImageMetadata;
use crate::scan::{BrowsableItem, ThumbnailState};
use crate::selection::ExportReport;
use crate::types::supported_extensions;
use std::path::Path;

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn source_label(source: ImageSource) -> &'static str {
    match source {
        ImageSource::Decoded => "decoded",
        ImageSource::EmbeddedPreview => "embedded preview",
        ImageSource::RawSensor => "raw sensor",
    }
}

/// Human-readable size with up to two decimals: `"500 B"`, `"1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    let number = format!("{size:.2}");
    let number = number.trim_end_matches('0').trim_end_matches('.');
    format!("{number} {}", SIZE_UNITS[unit])
}

/// Display lines for one metadata record. Empty fields are left out; size
/// and creation date are always shown.
pub fn format_metadata(metadata: &ImageMetadata) -> Vec<String> {
    let optional = [
        ("Resolution", &metadata.resolution),
        ("Camera", &metadata.camera_model),
        ("Lens", &metadata.lens_model),
        ("Exposure", &metadata.exposure_time),
        ("Aperture", &metadata.f_number),
        ("ISO", &metadata.iso_speed),
        ("Focal length", &metadata.focal_length),
    ];

    let mut lines: Vec<String> = optional
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| format!("{label}: {value}"))
        .collect();
    lines.push(format!("File size: {}", format_file_size(metadata.file_size)));
    lines.push(format!(
        "Created: {}",
        metadata.created.format("%Y-%m-%d %H:%M:%S")
    ));
    lines
}

/// Header plus detail lines for one filmstrip entry.
pub fn format_item(index: usize, item: &BrowsableItem) -> Vec<String> {
    let marker = if item.selected { " [selected]" } else { "" };
    let mut lines = vec![format!(
        "{} {}{}",
        format_index(index),
        item.display_name,
        marker
    )];

    match item.thumbnail {
        ThumbnailState::Ready => {}
        ThumbnailState::Pending => lines.push(format!("{}Thumbnail: pending", indent(1))),
        ThumbnailState::Failed => lines.push(format!("{}Thumbnail: failed", indent(1))),
    }
    if let Some(metadata) = &item.metadata {
        lines.extend(
            format_metadata(metadata)
                .into_iter()
                .map(|l| format!("{}{}", indent(1), l)),
        );
    }
    lines
}

pub fn format_scan_output(dir: &Path, items: &[BrowsableItem], stats: &CacheStats) -> Vec<String> {
    let mut lines = vec![format!("Images in {} ({})", dir.display(), items.len())];
    if items.is_empty() {
        let exts: Vec<&str> = supported_extensions().collect();
        lines.push(format!("{}No files matching: {}", indent(1), exts.join(", ")));
    }
    for (i, item) in items.iter().enumerate() {
        lines.extend(format_item(i + 1, item));
    }
    lines.push(String::new());
    lines.push(format!("Cache: {stats}"));
    lines
}

pub fn print_scan_output(dir: &Path, items: &[BrowsableItem], stats: &CacheStats) {
    for line in format_scan_output(dir, items, stats) {
        println!("{}", line);
    }
}

/// Lines for one progress event.
pub fn format_event(event: &BrowserEvent) -> Vec<String> {
    match event {
        BrowserEvent::ScanStarted { dir, files, .. } => {
            vec![format!("Scanning {} ({} images)", dir.display(), files)]
        }
        BrowserEvent::ItemLoaded {
            path,
            width,
            height,
            source,
        } => vec![format!(
            "{}{}: {}x{} ({})",
            indent(1),
            file_name(path),
            width,
            height,
            source_label(*source)
        )],
        BrowserEvent::DecodeFailed { path, reason } => {
            vec![format!("{}{}: failed ({})", indent(1), file_name(path), reason)]
        }
        BrowserEvent::FileSkipped { path, reason } => {
            let what = path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "entry".to_string());
            vec![format!("{}skipped {}: {}", indent(1), what, reason)]
        }
        BrowserEvent::StaleDiscarded { path, generation } => vec![format!(
            "{}discarded stale result for {} (scan {})",
            indent(1),
            file_name(path),
            generation
        )],
        BrowserEvent::Rotated { path, rotation } => {
            vec![format!("Rotated {} to {}°", file_name(path), rotation)]
        }
    }
}

/// Summary of a displayed image.
pub fn format_image_output(path: &Path, image: &DecodedImage) -> Vec<String> {
    let (w, h) = image.dimensions();
    let mut lines = vec![format!("{} {}x{}", file_name(path), w, h)];
    lines.push(format!("{}Source: {}", indent(1), source_label(image.source())));
    lines.push(format!(
        "{}Orientation: EXIF {}",
        indent(1),
        image.orientation().exif_code()
    ));
    if image.rotation() != 0 {
        lines.push(format!("{}Rotation: {}°", indent(1), image.rotation()));
    }
    lines
}

pub fn print_image_output(path: &Path, image: &DecodedImage) {
    for line in format_image_output(path, image) {
        println!("{}", line);
    }
}

pub fn format_export_report(report: &ExportReport) -> Vec<String> {
    let noun = if report.files.len() == 1 { "file" } else { "files" };
    let mut lines = vec![format!(
        "Exported {} {} ({}) to {}",
        report.files.len(),
        noun,
        format_file_size(report.total_bytes()),
        report.destination.display()
    )];
    lines.extend(
        report
            .files
            .iter()
            .map(|f| format!("{}{}", indent(1), file_name(&f.target))),
    );
    lines
}

pub fn print_export_report(report: &ExportReport) {
    for line in format_export_report(report) {
        println!("{}", line);
    }
}
