//! Two-generation build cache
//!
//! Every cache space keeps a *current* generation (what the previous build
//! produced) and a *next* generation (what this build touched). A lookup copies
//! the entry it finds, or the entry it creates, into *next*. Committing at the
//! end of a successful build replaces *current* with *next*, so entries for
//! files that were removed or renamed are dropped after one build.
//!
//! Entries are slots holding a lazily computed value. The slot is inserted
//! before the computation starts, so concurrent requests for one key within a
//! build wait on the same computation instead of repeating it.
//!
//! File contents are keyed by [`Fingerprint`], which is derived from `stat`
//! metadata rather than file contents; see that type for the tradeoff.

mod fingerprint;

pub use fingerprint::Fingerprint;

use crate::resolver::PackageConfig;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Slot<V> = Arc<OnceCell<V>>;

/// One cache space with its current and next generation
#[derive(Debug)]
pub struct Generations<K, V> {
    current: Mutex<HashMap<K, Slot<V>>>,
    next: Mutex<HashMap<K, Slot<V>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<K, V> Default for Generations<K, V> {
    fn default() -> Self {
        Self {
            current: Mutex::new(HashMap::new()),
            next: Mutex::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }
}

impl<K, V> Generations<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache space
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key`, computing the value on a miss
    ///
    /// A value found in the current generation is carried into the next one
    /// without recomputation. On a miss `compute` runs once and its value is
    /// stored in both generations. A failed computation is not cached.
    pub fn get_or_compute<E, F>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let slot = self.slot(key);

        let mut computed = false;
        let result = slot
            .get_or_try_init(|| {
                computed = true;
                compute()
            })
            .map(V::clone);

        let counter = if computed { &self.misses } else { &self.hits };
        counter.fetch_add(1, Ordering::Relaxed);

        result
    }

    /// Find or create the slot for `key` and mark it as used by this build
    fn slot(&self, key: &K) -> Slot<V> {
        let slot = {
            let mut current = self.current.lock();
            Arc::clone(current.entry(key.clone()).or_default())
        };
        self.next.lock().insert(key.clone(), Arc::clone(&slot));
        slot
    }

    /// Start a build: forget what the previous (possibly failed) build touched
    pub fn begin_generation(&self) {
        self.next.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Finish a successful build: keep only the entries it touched
    pub fn commit_generation(&self) {
        let next = mem::take(&mut *self.next.lock());
        *self.current.lock() = next;
    }

    /// Whether the current generation holds a computed value for `key`
    pub fn contains(&self, key: &K) -> bool {
        self.current
            .lock()
            .get(key)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Number of computed entries in the current generation
    pub fn len(&self) -> usize {
        self.current
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Check if the current generation holds no computed entry
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistics since the last `begin_generation`
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in the current generation
    pub entries: usize,
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
}

impl CacheStats {
    /// Get cache hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Statistics for both cache spaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCacheStats {
    pub files: CacheStats,
    pub packages: CacheStats,
}

/// Build cache owned by one bundler
///
/// Holds the file-contents space (fingerprint → wrapped contents) and the
/// package-config space (namespace → resolved configuration).
#[derive(Debug, Default)]
pub struct FileCache {
    files: Generations<Fingerprint, Arc<str>>,
    packages: Generations<String, Arc<PackageConfig>>,
}

impl FileCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrapped contents of the file identified by `fingerprint`
    pub fn file_contents<E, F>(&self, fingerprint: &Fingerprint, compute: F) -> Result<Arc<str>, E>
    where
        F: FnOnce() -> Result<Arc<str>, E>,
    {
        self.files.get_or_compute(fingerprint, compute)
    }

    /// Resolved configuration of package `namespace`
    pub fn package_config<E, F>(&self, namespace: &str, compute: F) -> Result<Arc<PackageConfig>, E>
    where
        F: FnOnce() -> Result<Arc<PackageConfig>, E>,
    {
        self.packages.get_or_compute(&namespace.to_string(), compute)
    }

    /// Start a build in both spaces
    pub fn begin_generation(&self) {
        self.files.begin_generation();
        self.packages.begin_generation();
    }

    /// Commit a successful build in both spaces
    pub fn commit_generation(&self) {
        self.files.commit_generation();
        self.packages.commit_generation();
    }

    /// File-contents space
    pub fn files(&self) -> &Generations<Fingerprint, Arc<str>> {
        &self.files
    }

    /// Package-config space
    pub fn packages(&self) -> &Generations<String, Arc<PackageConfig>> {
        &self.packages
    }

    /// Statistics for both spaces
    pub fn stats(&self) -> FileCacheStats {
        FileCacheStats {
            files: self.files.stats(),
            packages: self.packages.stats(),
        }
    }
}
