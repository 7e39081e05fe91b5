//! Image decoding backend trait and shared error type.
//!
//! The [`ImageBackend`] trait defines the two operations the browser needs
//! from a file: a width-bounded decode and a metadata read. Both run on
//! worker threads, so implementations must be `Send + Sync`.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests drive the browser
//! through [`tests::MockBackend`], which fabricates images without touching
//! the filesystem.

use super::decoded::DecodedImage;
use crate::metadata::{FileAttributes, ImageMetadata};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },
    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("{} decoded to an empty image", .0.display())]
    Empty(PathBuf),
}

impl DecodeError {
    /// The file the failure refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Format { path, .. } => path,
            Self::Unsupported(path) | Self::Empty(path) => path,
        }
    }
}

/// Trait for image decoding backends.
pub trait ImageBackend: Send + Sync {
    /// Decode `path` into an oriented RGBA bitmap no wider than `max_width`.
    ///
    /// `max_width == 0` requests full size. Images never upscale.
    fn decode(&self, path: &Path, max_width: u32) -> Result<DecodedImage, DecodeError>;

    /// Extract display metadata. Total: unreadable fields stay empty.
    fn read_metadata(&self, path: &Path, attrs: &FileAttributes) -> ImageMetadata;
}
