//! Directory scanning: find the browsable images in one folder.
//!
//! [`scan_directory`] checks the folder up front and then returns a lazy
//! [`DirectoryListing`]. Nothing is decoded here; each yielded item starts
//! with a pending thumbnail and no metadata, and the browser schedules the
//! expensive work per file.
//!
//! ## Rules
//!
//! - Non-recursive: subdirectories are ignored.
//! - Extension allowlist, case-insensitive: `jpg jpeg png gif bmp` plus the
//!   RAW family `raw nef cr2 arw dng`. Other files are silently left out.
//! - Order is whatever the filesystem enumerates. Sorting is a separate,
//!   explicit step (see [`crate::sort`]).
//! - Symlinks are followed.
//!
//! ## Failure scope
//!
//! An unreadable or missing directory aborts the scan with [`ScanError`].
//! A broken entry, or a file whose size and timestamps can't be read, is
//! yielded as a [`SkippedFile`] and the listing continues.

use crate::metadata::{FileAttributes, ImageMetadata};
use crate::types::is_supported;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Thumbnail progress for one item. Moves out of `Pending` exactly once per scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailState {
    Pending,
    Ready,
    Failed,
}

/// One entry in the filmstrip.
///
/// The path is the identity. Thumbnail pixels are not stored here: they live
/// in the cache under `(path, Thumbnail)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowsableItem {
    pub path: PathBuf,
    pub display_name: String,
    pub thumbnail: ThumbnailState,
    pub metadata: Option<ImageMetadata>,
    /// Mirror of selection membership, kept in sync by the browser.
    pub selected: bool,
}

impl BrowsableItem {
    pub fn new(path: PathBuf) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            display_name,
            thumbnail: ThumbnailState::Pending,
            metadata: None,
            selected: false,
        }
    }
}

/// A supported file together with its filesystem attributes.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub item: BrowsableItem,
    pub attributes: FileAttributes,
}

/// An entry the listing could not use.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    /// `None` when the entry's path itself couldn't be determined.
    pub path: Option<PathBuf>,
    pub reason: String,
}

/// Lazy, non-recursive enumeration of one directory's supported images.
pub struct DirectoryListing {
    dir: PathBuf,
    entries: walkdir::IntoIter,
}

impl DirectoryListing {
    /// The directory being listed.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Iterator for DirectoryListing {
    type Item = Result<ScannedFile, SkippedFile>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(Err(SkippedFile {
                        path: e.path().map(Path::to_path_buf),
                        reason: e.to_string(),
                    }));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if !is_supported(&path) {
                continue;
            }

            return Some(match FileAttributes::read(&path) {
                Ok(attributes) => Ok(ScannedFile {
                    item: BrowsableItem::new(path),
                    attributes,
                }),
                Err(e) => Err(SkippedFile {
                    path: Some(path),
                    reason: e.to_string(),
                }),
            });
        }
    }
}

/// Start listing `dir`.
///
/// Fails only if the directory itself can't be read.
pub fn scan_directory(dir: &Path) -> Result<DirectoryListing, ScanError> {
    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let meta = fs::metadata(dir).map_err(io_err)?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }
    // Surface permission errors now rather than as a skipped first entry.
    fs::read_dir(dir).map_err(io_err)?;

    Ok(DirectoryListing {
        dir: dir.to_path_buf(),
        entries: WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter(),
    })
}
