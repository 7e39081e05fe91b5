//! Selection membership, the export staging list, and export itself.
//!
//! The set of selected paths is the authority for export. Alongside it the
//! staging list keeps one [`StagedImage`] per selected file that loaded
//! successfully at full size, which is what a preview panel shows.
//!
//! Paths are kept in a `BTreeSet`, so export copies files in path order and
//! the outcome is reproducible. Selection is not cleared when a new
//! directory is scanned; images can be gathered from several folders and
//! exported together.

use crate::imaging::{DecodeError, DecodedImage};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no export destination chosen")]
    NoDestination,
    #[error("no images selected")]
    NothingSelected,
    #[error("failed to copy {}: {source} ({} file(s) already copied)", path.display(), copied.len())]
    Copy {
        path: PathBuf,
        source: io::Error,
        /// Files copied before the failure. They are left in place.
        copied: Vec<ExportedFile>,
    },
}

/// A selected image ready for display in the staging panel.
#[derive(Debug, Clone)]
pub struct StagedImage {
    pub path: PathBuf,
    pub thumbnail: Option<Arc<DecodedImage>>,
    pub full_size: Arc<DecodedImage>,
}

/// What a toggle did.
#[derive(Debug)]
pub struct ToggleOutcome {
    /// Membership after the toggle.
    pub selected: bool,
    /// Whether a staging record now exists for the path.
    pub staged: bool,
    /// Why staging failed, when selecting a file that wouldn't load.
    pub error: Option<DecodeError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub source: PathBuf,
    pub target: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub destination: PathBuf,
    pub files: Vec<ExportedFile>,
}

impl ExportReport {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

#[derive(Debug, Default)]
pub struct SelectionSet {
    selected: BTreeSet<PathBuf>,
    staged: Vec<StagedImage>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `path`.
    ///
    /// Selecting calls `stage` to load the images for the staging panel. If
    /// that fails the path stays selected (export copies the file bytes and
    /// doesn't need pixels) but no staging record is added.
    pub fn toggle<F>(&mut self, path: &Path, stage: F) -> ToggleOutcome
    where
        F: FnOnce(&Path) -> Result<StagedImage, DecodeError>,
    {
        if self.remove(path) {
            return ToggleOutcome {
                selected: false,
                staged: false,
                error: None,
            };
        }

        self.selected.insert(path.to_path_buf());
        match stage(path) {
            Ok(staged) => {
                self.staged.push(staged);
                ToggleOutcome {
                    selected: true,
                    staged: true,
                    error: None,
                }
            }
            Err(e) => ToggleOutcome {
                selected: true,
                staged: false,
                error: Some(e),
            },
        }
    }

    /// Drop `path` from the selection and the staging list. Returns whether
    /// it was selected.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.staged.retain(|s| s.path != path);
        self.selected.remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.selected.contains(path)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected paths in export order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.selected.iter().map(PathBuf::as_path)
    }

    /// Staging records in selection order.
    pub fn staged(&self) -> &[StagedImage] {
        &self.staged
    }

    /// Copy every selected file into `destination`, overwriting files with
    /// the same name.
    ///
    /// Stops at the first failure; files already copied stay copied and are
    /// listed in the error. The destination directory is not created.
    pub fn export(&self, destination: Option<&Path>) -> Result<ExportReport, ExportError> {
        let destination = destination.ok_or(ExportError::NoDestination)?;
        if self.selected.is_empty() {
            return Err(ExportError::NothingSelected);
        }

        let mut copied = Vec::with_capacity(self.selected.len());
        for source in &self.selected {
            let Some(name) = source.file_name() else {
                return Err(ExportError::Copy {
                    path: source.clone(),
                    source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                    copied,
                });
            };
            let target = destination.join(name);
            match fs::copy(source, &target) {
                Ok(bytes) => copied.push(ExportedFile {
                    source: source.clone(),
                    target,
                    bytes,
                }),
                Err(e) => {
                    return Err(ExportError::Copy {
                        path: source.clone(),
                        source: e,
                        copied,
                    });
                }
            }
        }

        Ok(ExportReport {
            destination: destination.to_path_buf(),
            files: copied,
        })
    }
}
