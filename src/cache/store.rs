//! Keyed cache store: a typed map behind a shared-reader / exclusive-writer
//! lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Thread-safe key/value map.
///
/// Reads take the shared lock and return clones, so callers never observe a
/// value while a writer is replacing it. A missing key is a plain `None`.
pub struct KeyedStore<K, V> {
    entries: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for KeyedStore<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        V: Clone,
    {
        rw_read(&self.entries, SOURCE, "get").get(key).cloned()
    }

    /// Insert or overwrite.
    pub fn set(&self, key: K, value: V) {
        rw_write(&self.entries, SOURCE, "set").insert(key, value);
    }

    /// Remove every entry. Returns how many were dropped.
    pub fn flush(&self) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "flush");
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` with the shared lock held.
    pub(crate) fn read_with<R>(&self, op: &'static str, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        f(&rw_read(&self.entries, SOURCE, op))
    }

    /// Run `f` with the exclusive lock held. Compound updates that must not
    /// interleave with a flush go through here.
    pub(crate) fn write_with<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut HashMap<K, V>) -> R,
    ) -> R {
        f(&mut rw_write(&self.entries, SOURCE, op))
    }
}
