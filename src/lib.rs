//! # Filmstrip
//!
//! The core of a photo browser: point it at a folder, get a filmstrip of
//! thumbnails with EXIF details, pick images, rotate the one on screen, and
//! copy the picks somewhere else.
//!
//! # Architecture: Owning Thread + Worker Pool
//!
//! ```text
//! scan_directory ─▶ Browser ──spawn──▶ rayon pool: decode + metadata
//!                      ▲                         │
//!                      └──── mpsc completions ───┘
//!                      │
//!                      ├─▶ BoundedImageCache   (thumbnail / full-size pools)
//!                      ├─▶ items               (filmstrip order, sortable)
//!                      └─▶ SelectionSet        (export authority)
//! ```
//!
//! The [`browser::Browser`] owns every piece of mutable state. Workers only
//! read the shared decoder, and their results are applied back on the owning
//! thread, so neither the cache nor the item list needs a lock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`browser`] | Session state: scan scheduling, stale-result discard, rotation, selection |
//! | [`cache`] | Bounded `(path, size class)` image cache with first-in, first-out eviction |
//! | [`scan`] | Lazy, non-recursive enumeration of supported image files |
//! | [`imaging`] | Decoding to oriented RGBA bitmaps, RAW preview extraction |
//! | [`metadata`] | Best-effort EXIF + filesystem metadata, per-field failure |
//! | [`selection`] | Selected paths, staging list, export by copy |
//! | [`sort`] | Stable re-ordering by name, date or size |
//! | [`config`] | Thumbnail width, cache capacity, worker count |
//! | [`types`] | Extension allowlist and size classes shared across modules |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Insertion-Order Eviction
//!
//! Each cache pool evicts its oldest *inserted* entry, not its least recently
//! *used* one. Hits never reorder entries. An evicted thumbnail is decoded
//! again the next time it is asked for.
//!
//! ## Embedded Previews for RAW
//!
//! Camera RAW files carry a JPEG rendered by the camera. Both thumbnails and
//! full-size views use the largest one that decodes. Sensor decoding through
//! `rawloader` is the fallback.
//!
//! ## Failures Stay Local
//!
//! A corrupt file marks its own thumbnail as failed and leaves every other
//! item alone. Metadata extraction never fails at all: unreadable EXIF
//! fields are simply empty. Only an unreadable directory aborts a scan.

pub mod browser;
pub mod cache;
pub mod config;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod scan;
pub mod selection;
pub mod sort;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
