//! The browsing session: one directory's items, the cache, the selection,
//! and the displayed image.
//!
//! ## Threading model
//!
//! A [`Browser`] lives on one owning thread and is the only thing that
//! mutates its state. Expensive work runs on a rayon pool:
//!
//! ```text
//! open_directory ──spawn──▶ worker: decode thumbnail + read metadata
//!                                        │
//!                                  mpsc channel
//!                                        ▼
//! process_pending / wait_idle ──▶ apply on owning thread (cache, items)
//! ```
//!
//! Workers only read the shared backend. The cache and item list are
//! touched exclusively while applying completions, so they need no locks.
//!
//! A panic inside a backend call is caught where the unit runs. A panicking
//! decode becomes a [`DecodeError::Format`], a panicking metadata read falls
//! back to filesystem attributes, and a panicking rotation is reported as a
//! failure. Every unit sends exactly one completion.
//!
//! ## Generations
//!
//! Every successful `open_directory` bumps a generation counter. Work is
//! tagged with the generation it was spawned under, and completions from an
//! older generation are dropped with a [`BrowserEvent::StaleDiscarded`]
//! event instead of being applied to the new directory.
//!
//! ## Rotation
//!
//! Rotating the displayed image is also a background unit. Until its result
//! has been applied the browser is busy and a second
//! [`Browser::begin_rotation`] returns [`RotateError::Busy`]. The rotated
//! image replaces the displayed one but is never written to the cache.

use crate::cache::{BoundedImageCache, CacheStats};
use crate::config::{BrowserConfig, ConfigError, effective_threads};
use crate::imaging::{DecodeError, DecodedImage, ImageBackend, ImageSource};
use crate::metadata::{FileAttributes, ImageMetadata};
use crate::scan::{self, BrowsableItem, ScanError, ScannedFile, ThumbnailState};
use crate::selection::{ExportError, ExportReport, SelectionSet, StagedImage, ToggleOutcome};
use crate::sort::{self, SortDirection, SortKey};
use crate::types::SizeClass;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RotateError {
    #[error("no image is displayed")]
    NothingDisplayed,
    #[error("a rotation is already in progress")]
    Busy,
}

/// Progress events sent to an observer (the CLI prints them).
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserEvent {
    /// Enumeration finished and per-file work has been scheduled.
    ScanStarted {
        dir: PathBuf,
        generation: u64,
        files: usize,
    },
    ItemLoaded {
        path: PathBuf,
        width: u32,
        height: u32,
        source: ImageSource,
    },
    DecodeFailed {
        path: PathBuf,
        reason: String,
    },
    FileSkipped {
        path: Option<PathBuf>,
        reason: String,
    },
    /// A completion from a superseded scan was dropped.
    StaleDiscarded {
        path: PathBuf,
        generation: u64,
    },
    Rotated {
        path: PathBuf,
        rotation: u16,
    },
}

/// Result of one background unit, marshaled back to the owning thread.
enum Completion {
    Item {
        generation: u64,
        path: PathBuf,
        thumbnail: Result<DecodedImage, DecodeError>,
        metadata: ImageMetadata,
    },
    Rotation {
        generation: u64,
        path: PathBuf,
        /// `None` when the rotation panicked.
        image: Option<DecodedImage>,
    },
}

/// Run backend work, turning a panic into `None`.
fn guarded<T>(work: impl FnOnce() -> T) -> Option<T> {
    panic::catch_unwind(AssertUnwindSafe(work)).ok()
}

fn decode_guarded(
    backend: &dyn ImageBackend,
    path: &Path,
    max_width: u32,
) -> Result<DecodedImage, DecodeError> {
    guarded(|| backend.decode(path, max_width)).unwrap_or_else(|| {
        Err(DecodeError::Format {
            path: path.to_path_buf(),
            reason: "decoder panicked".to_string(),
        })
    })
}

struct Displayed {
    path: PathBuf,
    image: Arc<DecodedImage>,
}

pub struct Browser {
    config: BrowserConfig,
    backend: Arc<dyn ImageBackend>,
    pool: rayon::ThreadPool,
    cache: BoundedImageCache,
    directory: Option<PathBuf>,
    items: Vec<BrowsableItem>,
    selection: SelectionSet,
    generation: u64,
    results_tx: Sender<Completion>,
    results_rx: Receiver<Completion>,
    in_flight: usize,
    displayed: Option<Displayed>,
    rotating: bool,
    events: Option<Sender<BrowserEvent>>,
}

impl Browser {
    /// Validate `config` and start the worker pool.
    pub fn new(config: BrowserConfig, backend: Arc<dyn ImageBackend>) -> Result<Self, BrowserError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(effective_threads(&config))
            .thread_name(|i| format!("filmstrip-decode-{i}"))
            .build()?;
        let (results_tx, results_rx) = mpsc::channel();

        Ok(Self {
            cache: BoundedImageCache::new(config.cache_capacity),
            config,
            backend,
            pool,
            directory: None,
            items: Vec::new(),
            selection: SelectionSet::new(),
            generation: 0,
            results_tx,
            results_rx,
            in_flight: 0,
            displayed: None,
            rotating: false,
            events: None,
        })
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: Sender<BrowserEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: BrowserEvent) {
        if let Some(tx) = &self.events {
            // A closed observer just stops receiving.
            let _ = tx.send(event);
        }
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Switch to `dir`: clear the cache and item list, enumerate supported
    /// files, and schedule a thumbnail + metadata unit for each.
    ///
    /// On error the current directory and items are left untouched.
    /// Returns the number of items found.
    pub fn open_directory(&mut self, dir: &Path) -> Result<usize, ScanError> {
        let listing = scan::scan_directory(dir)?;

        self.generation += 1;
        self.cache.clear();
        self.items.clear();
        self.displayed = None;
        self.directory = Some(dir.to_path_buf());

        for entry in listing {
            match entry {
                Ok(ScannedFile {
                    mut item,
                    attributes,
                }) => {
                    item.selected = self.selection.contains(&item.path);
                    self.spawn_item(item.path.clone(), attributes);
                    self.items.push(item);
                }
                Err(skipped) => self.emit(BrowserEvent::FileSkipped {
                    path: skipped.path,
                    reason: skipped.reason,
                }),
            }
        }

        self.emit(BrowserEvent::ScanStarted {
            dir: dir.to_path_buf(),
            generation: self.generation,
            files: self.items.len(),
        });
        Ok(self.items.len())
    }

    fn spawn_item(&mut self, path: PathBuf, attributes: FileAttributes) {
        let backend = Arc::clone(&self.backend);
        let tx = self.results_tx.clone();
        let generation = self.generation;
        let width = self.config.thumbnail_width;

        self.in_flight += 1;
        self.pool.spawn(move || {
            let thumbnail = decode_guarded(backend.as_ref(), &path, width);
            let metadata = guarded(|| backend.read_metadata(&path, &attributes))
                .unwrap_or_else(|| ImageMetadata::from_attributes(&path, &attributes));
            let _ = tx.send(Completion::Item {
                generation,
                path,
                thumbnail,
                metadata,
            });
        });
    }

    // =========================================================================
    // Applying completions
    // =========================================================================

    /// Apply every completion that has already arrived, without blocking.
    /// Returns how many were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.results_rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Block until all scheduled work has completed and been applied.
    pub fn wait_idle(&mut self) {
        while self.in_flight > 0 {
            match self.results_rx.recv() {
                Ok(completion) => self.apply(completion),
                Err(_) => break,
            }
        }
    }

    fn apply(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Item {
                generation,
                path,
                thumbnail,
                metadata,
            } => self.apply_item(generation, path, thumbnail, metadata),
            Completion::Rotation {
                generation,
                path,
                image,
            } => self.apply_rotation(generation, path, image),
        }
    }

    fn apply_item(
        &mut self,
        generation: u64,
        path: PathBuf,
        thumbnail: Result<DecodedImage, DecodeError>,
        metadata: ImageMetadata,
    ) {
        if generation != self.generation {
            self.emit(BrowserEvent::StaleDiscarded { path, generation });
            return;
        }

        // Going through get_or_load keeps an entry that is already cached.
        let state = match thumbnail.and_then(|image| {
            self.cache
                .get_or_load(&path, SizeClass::Thumbnail, move |_| Ok(image))
        }) {
            Ok(image) => {
                self.emit(BrowserEvent::ItemLoaded {
                    path: path.clone(),
                    width: image.width(),
                    height: image.height(),
                    source: image.source(),
                });
                ThumbnailState::Ready
            }
            Err(e) => {
                self.emit(BrowserEvent::DecodeFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                ThumbnailState::Failed
            }
        };

        if let Some(item) = self.items.iter_mut().find(|i| i.path == path) {
            item.thumbnail = state;
            item.metadata = Some(metadata);
        }
    }

    fn apply_rotation(&mut self, generation: u64, path: PathBuf, image: Option<DecodedImage>) {
        self.rotating = false;
        let current = self
            .displayed
            .as_ref()
            .is_some_and(|d| d.path == path && generation == self.generation);
        if !current {
            self.emit(BrowserEvent::StaleDiscarded { path, generation });
            return;
        }
        let Some(image) = image else {
            self.emit(BrowserEvent::DecodeFailed {
                path,
                reason: "rotation panicked".to_string(),
            });
            return;
        };

        let rotation = image.rotation();
        self.displayed = Some(Displayed {
            path: path.clone(),
            image: Arc::new(image),
        });
        self.emit(BrowserEvent::Rotated { path, rotation });
    }

    // =========================================================================
    // Images
    // =========================================================================

    /// The thumbnail for `path`, decoding it again if it was evicted.
    pub fn thumbnail(&mut self, path: &Path) -> Result<Arc<DecodedImage>, DecodeError> {
        let backend = Arc::clone(&self.backend);
        let width = self.config.thumbnail_width;
        self.cache
            .get_or_load(path, SizeClass::Thumbnail, |p| {
                decode_guarded(backend.as_ref(), p, width)
            })
    }

    /// Load `path` at full size and make it the displayed image.
    ///
    /// Any previous rotation is discarded; the cached full-size image is
    /// always unrotated.
    pub fn open_image(&mut self, path: &Path) -> Result<Arc<DecodedImage>, DecodeError> {
        let backend = Arc::clone(&self.backend);
        let image = self
            .cache
            .get_or_load(path, SizeClass::FullSize, |p| {
                decode_guarded(backend.as_ref(), p, 0)
            })?;
        self.displayed = Some(Displayed {
            path: path.to_path_buf(),
            image: Arc::clone(&image),
        });
        Ok(image)
    }

    /// Start rotating the displayed image 90° clockwise in the background.
    pub fn begin_rotation(&mut self) -> Result<(), RotateError> {
        if self.rotating {
            return Err(RotateError::Busy);
        }
        let displayed = self.displayed.as_ref().ok_or(RotateError::NothingDisplayed)?;
        let image = Arc::clone(&displayed.image);
        let path = displayed.path.clone();
        let tx = self.results_tx.clone();
        let generation = self.generation;

        self.rotating = true;
        self.in_flight += 1;
        self.pool.spawn(move || {
            let image = guarded(|| image.rotated_clockwise());
            let _ = tx.send(Completion::Rotation {
                generation,
                path,
                image,
            });
        });
        Ok(())
    }

    pub fn displayed(&self) -> Option<&Arc<DecodedImage>> {
        self.displayed.as_ref().map(|d| &d.image)
    }

    pub fn displayed_path(&self) -> Option<&Path> {
        self.displayed.as_ref().map(|d| d.path.as_path())
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    // =========================================================================
    // Ordering and selection
    // =========================================================================

    /// Re-order the items. Never schedules a decode.
    pub fn sort(&mut self, key: SortKey, direction: SortDirection) {
        sort::sort_items(&mut self.items, key, direction);
    }

    /// Flip selection of `path`.
    ///
    /// Selecting loads the full-size image through the cache for the staging
    /// list. If it can't be loaded the path is still selected, the outcome
    /// reports `staged: false`, and a `DecodeFailed` event is sent.
    pub fn toggle(&mut self, path: &Path) -> ToggleOutcome {
        let backend = Arc::clone(&self.backend);
        let cache = &mut self.cache;
        let outcome = self.selection.toggle(path, |p| {
            let full_size = cache.get_or_load(p, SizeClass::FullSize, |p| {
                decode_guarded(backend.as_ref(), p, 0)
            })?;
            Ok(StagedImage {
                path: p.to_path_buf(),
                thumbnail: cache.get(p, SizeClass::Thumbnail),
                full_size,
            })
        });

        if let Some(e) = &outcome.error {
            self.emit(BrowserEvent::DecodeFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
        self.mirror_selection(path, outcome.selected);
        outcome
    }

    /// Remove `path` from the selection and staging list.
    pub fn remove_selection(&mut self, path: &Path) -> bool {
        let removed = self.selection.remove(path);
        self.mirror_selection(path, false);
        removed
    }

    fn mirror_selection(&mut self, path: &Path, selected: bool) {
        if let Some(item) = self.items.iter_mut().find(|i| i.path == path) {
            item.selected = selected;
        }
    }

    /// Copy the selected files into `destination`.
    pub fn export(&self, destination: Option<&Path>) -> Result<ExportReport, ExportError> {
        self.selection.export(destination)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn items(&self) -> &[BrowsableItem] {
        &self.items
    }

    pub fn item(&self, path: &Path) -> Option<&BrowsableItem> {
        self.items.iter().find(|i| i.path == path)
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn cache(&self) -> &BoundedImageCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Units scheduled but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}
