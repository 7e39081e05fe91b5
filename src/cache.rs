//! Bounded in-memory cache of decoded images.
//!
//! Decoding is the expensive step of browsing, so every decoded bitmap is
//! memoized under `(path, size class)`. Thumbnails and full-size images live
//! in separate pools with the same capacity; filling one never evicts from
//! the other.
//!
//! # Eviction
//!
//! Each pool evicts its **first inserted** entry once it is full. Lookups do
//! not refresh an entry's position, so this is FIFO, not LRU. A hit returns
//! the stored `Arc` unchanged, with no re-validation against the file's
//! modification time: the cache lives for one directory load and is cleared
//! when the browser switches directories.
//!
//! # Failures
//!
//! Loader errors propagate to the caller and are never stored. Asking again
//! for a key that failed calls the loader again.
//!
//! # Threading
//!
//! The cache is a plain owned value with `&mut self` mutation. The browser
//! keeps it on its owning thread; workers decode and hand results back, and
//! the owning thread inserts them.

use crate::imaging::{DecodeError, DecodedImage};
use crate::types::SizeClass;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default number of entries per size class.
pub const DEFAULT_CAPACITY: usize = 100;

/// One size class's entries plus their insertion order.
#[derive(Debug, Default)]
struct Pool {
    entries: HashMap<PathBuf, Arc<DecodedImage>>,
    order: VecDeque<PathBuf>,
}

/// Fixed-capacity `(path, size class) → image` store.
#[derive(Debug)]
pub struct BoundedImageCache {
    capacity: usize,
    thumbnails: Pool,
    full_size: Pool,
    stats: CacheStats,
}

impl BoundedImageCache {
    /// A cache holding up to `capacity` entries per size class.
    ///
    /// Configuration validation rejects zero; a zero here is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            thumbnails: Pool::default(),
            full_size: Pool::default(),
            stats: CacheStats::default(),
        }
    }

    fn pool(&self, class: SizeClass) -> &Pool {
        match class {
            SizeClass::Thumbnail => &self.thumbnails,
            SizeClass::FullSize => &self.full_size,
        }
    }

    fn pool_mut(&mut self, class: SizeClass) -> &mut Pool {
        match class {
            SizeClass::Thumbnail => &mut self.thumbnails,
            SizeClass::FullSize => &mut self.full_size,
        }
    }

    /// Return the cached image, or run `loader` and cache its result.
    ///
    /// On a hit the loader is not called and the same `Arc` comes back.
    pub fn get_or_load<F>(
        &mut self,
        path: &Path,
        class: SizeClass,
        loader: F,
    ) -> Result<Arc<DecodedImage>, DecodeError>
    where
        F: FnOnce(&Path) -> Result<DecodedImage, DecodeError>,
    {
        if let Some(hit) = self.pool(class).entries.get(path) {
            let hit = Arc::clone(hit);
            self.stats.hit();
            return Ok(hit);
        }

        self.stats.miss();
        let image = Arc::new(loader(path)?);
        self.insert(path, class, Arc::clone(&image));
        Ok(image)
    }

    fn insert(&mut self, path: &Path, class: SizeClass, image: Arc<DecodedImage>) {
        let capacity = self.capacity;
        let pool = self.pool_mut(class);
        let mut evicted = 0;
        while pool.entries.len() >= capacity {
            let Some(oldest) = pool.order.pop_front() else {
                break;
            };
            pool.entries.remove(&oldest);
            evicted += 1;
        }
        pool.entries.insert(path.to_path_buf(), image);
        pool.order.push_back(path.to_path_buf());
        self.stats.evictions += evicted;
    }

    /// Look up without loading. Does not count as a hit.
    pub fn get(&self, path: &Path, class: SizeClass) -> Option<Arc<DecodedImage>> {
        self.pool(class).entries.get(path).cloned()
    }

    pub fn contains(&self, path: &Path, class: SizeClass) -> bool {
        self.pool(class).entries.contains_key(path)
    }

    /// Number of live entries in one size class.
    pub fn len(&self, class: SizeClass) -> usize {
        self.pool(class).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        SizeClass::ALL.iter().all(|c| self.len(*c) == 0)
    }

    /// Per-pool entry bound.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached paths of one size class, oldest first.
    pub fn paths(&self, class: SizeClass) -> impl Iterator<Item = &Path> {
        self.pool(class).order.iter().map(PathBuf::as_path)
    }

    /// Drop every entry in both pools. Counters keep accumulating.
    pub fn clear(&mut self) {
        self.thumbnails = Pool::default();
        self.full_size = Pool::default();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

impl Default for BoundedImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Summary of cache performance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
    pub evictions: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} decoded ({} total)",
                self.hits,
                self.misses,
                self.total()
            )?;
        } else {
            write!(f, "{} decoded", self.misses)?;
        }
        if self.evictions > 0 {
            write!(f, ", {} evicted", self.evictions)?;
        }
        Ok(())
    }
}
