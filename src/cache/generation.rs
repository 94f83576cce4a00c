//! Invalidation-aware cache.
//!
//! Entries live in a *generation*. A flush discards the whole generation:
//! the map is cleared, every release action registered since the previous
//! flush runs once in insertion order, and the generation number advances.
//! All three happen under the store's write lock, so readers see either the
//! old generation or the new, empty one.
//!
//! Computations that read from the origin capture [`GenerationalCache::generation`]
//! before they start and write back through
//! [`GenerationalCache::set_in_generation`]; a write that raced with a flush is
//! dropped instead of resurrecting pre-flush data.

use std::hash::Hash;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use tracing::debug;

use super::lock::mutex_lock;
use super::store::KeyedStore;

const SOURCE: &str = "cache::generation";
const METRIC_FLUSH_TOTAL: &str = "catalogd_cache_flush_total";

/// Action run exactly once when the generation it was registered in is
/// discarded. Must not touch the cache that owns it.
pub type Release = Box<dyn FnOnce() + Send + 'static>;

/// Monotonic generation number. A fresh cache starts at zero.
pub type Generation = u64;

pub struct GenerationalCache<K, V> {
    name: &'static str,
    store: KeyedStore<K, V>,
    releases: Mutex<Vec<Release>>,
    generation: AtomicU64,
}

impl<K, V> GenerationalCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            store: KeyedStore::new(),
            releases: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        V: Clone,
    {
        self.store.get(key)
    }

    pub fn generation(&self) -> Generation {
        self.generation.load(Ordering::Acquire)
    }

    pub fn set(&self, key: K, value: V) {
        self.store.set(key, value);
    }

    /// Store `value` and register `release` against the current generation.
    pub fn set_with_cleanup(&self, key: K, value: V, release: Release) {
        self.store.write_with("set_with_cleanup", |entries| {
            entries.insert(key, value);
            mutex_lock(&self.releases, SOURCE, "set_with_cleanup").push(release);
        });
    }

    /// Store `value` only if `generation` is still current. Returns whether
    /// the value was stored.
    pub fn set_in_generation(&self, generation: Generation, key: K, value: V) -> bool {
        self.store.write_with("set_in_generation", |entries| {
            if self.generation() != generation {
                return false;
            }
            entries.insert(key, value);
            true
        })
    }

    /// [`Self::set_with_cleanup`] guarded like [`Self::set_in_generation`].
    ///
    /// When the generation has moved on, `release` is handed back so the
    /// caller can run or drop it.
    pub fn set_with_cleanup_in_generation(
        &self,
        generation: Generation,
        key: K,
        value: V,
        release: Release,
    ) -> Result<(), Release> {
        self.store.write_with("set_with_cleanup_in_generation", |entries| {
            if self.generation() != generation {
                return Err(release);
            }
            entries.insert(key, value);
            mutex_lock(&self.releases, SOURCE, "set_with_cleanup_in_generation").push(release);
            Ok(())
        })
    }

    /// Discard the current generation.
    pub fn flush(&self) -> Generation {
        self.store.write_with("flush", |entries| self.discard(entries))
    }

    /// Discard the current generation and seed the next one with a single
    /// entry, atomically: no reader observes the empty state in between.
    pub fn flush_with_replacement(&self, key: K, value: V) -> Generation {
        self.store.write_with("flush_with_replacement", |entries| {
            let next = self.discard(entries);
            entries.insert(key, value);
            next
        })
    }

    /// [`Self::flush_with_replacement`] for a value computed in `generation`.
    ///
    /// When another flush got in first the value is stale: the current
    /// generation is still discarded but nothing is seeded. Returns the new
    /// generation and whether the value was installed.
    pub fn flush_with_replacement_in_generation(
        &self,
        generation: Generation,
        key: K,
        value: V,
    ) -> (Generation, bool) {
        self.store
            .write_with("flush_with_replacement_in_generation", |entries| {
                let current = self.generation() == generation;
                let next = self.discard(entries);
                if current {
                    entries.insert(key, value);
                }
                (next, current)
            })
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn discard(&self, entries: &mut std::collections::HashMap<K, V>) -> Generation {
        let dropped = entries.len();
        entries.clear();

        let releases = std::mem::take(&mut *mutex_lock(&self.releases, SOURCE, "flush"));
        let released = releases.len();
        for release in releases {
            release();
        }

        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        counter!(METRIC_FLUSH_TOTAL, "cache" => self.name).increment(1);
        debug!(
            cache = self.name,
            dropped,
            released,
            generation = next,
            "Flushed cache generation"
        );
        next
    }
}
