//! Shared types used by the decoder, cache, scanner and browser.
//!
//! The extension allowlist lives here because two stages consult it: the
//! scanner filters directory entries with [`is_supported`], and the decoder
//! picks its strategy with [`FormatFamily::from_path`]. Both must agree.

use serde::Serialize;
use std::path::Path;

/// Extensions decoded directly by the `image` crate.
const STANDARD_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Camera RAW containers. Decoded from their embedded preview when possible.
const RAW_EXTENSIONS: &[&str] = &["raw", "nef", "cr2", "arw", "dng"];

/// Cache partition key.
///
/// The same file is cached independently as a filmstrip thumbnail and as a
/// full-size image; the two pools never evict each other's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Thumbnail,
    FullSize,
}

impl SizeClass {
    pub const ALL: [SizeClass; 2] = [SizeClass::Thumbnail, SizeClass::FullSize];
}

/// Decoding strategy, selected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    /// JPEG, PNG, GIF, BMP.
    Standard,
    /// RAW-family container (CR2, NEF, ARW, DNG, generic RAW).
    Raw,
}

impl FormatFamily {
    /// Classify a path by extension (case-insensitive). `None` for anything
    /// outside the allowlist.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if STANDARD_EXTENSIONS
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
        {
            Some(Self::Standard)
        } else if RAW_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            Some(Self::Raw)
        } else {
            None
        }
    }
}

/// Whether the scanner should pick up this file.
pub fn is_supported(path: &Path) -> bool {
    FormatFamily::from_path(path).is_some()
}

/// Every supported extension, standard formats first.
pub fn supported_extensions() -> impl Iterator<Item = &'static str> {
    STANDARD_EXTENSIONS
        .iter()
        .chain(RAW_EXTENSIONS.iter())
        .copied()
}
