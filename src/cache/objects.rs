//! Entity object cache keyed by id.

use metrics::counter;

use crate::domain::entities::CatalogEntity;

use super::store::KeyedStore;

const METRIC_OBJECT_HIT: &str = "catalogd_cache_object_hit_total";
const METRIC_OBJECT_MISS: &str = "catalogd_cache_object_miss_total";

/// Read-optimized projection of one entity table.
///
/// Unbounded: it is preloaded in full at startup, grows with every insert
/// batch, and is only rebuilt wholesale on reinitialization.
pub struct EntityCache<E> {
    store: KeyedStore<i64, E>,
}

impl<E: CatalogEntity> Default for EntityCache<E> {
    fn default() -> Self {
        Self {
            store: KeyedStore::new(),
        }
    }
}

impl<E: CatalogEntity> EntityCache<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<E> {
        let found = self.store.get(&id);
        record_lookup::<E>(found.is_some());
        found
    }

    /// Look up `ids` under a single read lock.
    ///
    /// Found entities come back in input order; absent ids are skipped and
    /// reported through the returned flag instead of an error.
    pub fn get_multi(&self, ids: &[i64]) -> (Vec<E>, bool) {
        let found: Vec<E> = self.store.read_with("get_multi", |entries| {
            ids.iter().filter_map(|id| entries.get(id).cloned()).collect()
        });
        let missing = ids.len() - found.len();
        if !found.is_empty() {
            counter!(METRIC_OBJECT_HIT, "entity" => E::KIND.as_str()).increment(found.len() as u64);
        }
        if missing > 0 {
            counter!(METRIC_OBJECT_MISS, "entity" => E::KIND.as_str()).increment(missing as u64);
        }
        (found, missing == 0)
    }

    pub fn set(&self, entity: E) {
        self.store.set(entity.id(), entity);
    }

    pub fn set_many(&self, entities: impl IntoIterator<Item = E>) {
        self.store.write_with("set_many", |entries| {
            for entity in entities {
                entries.insert(entity.id(), entity);
            }
        });
    }

    /// Mutate a cached entity in place. Returns the updated copy, or `None`
    /// when the id is not cached.
    pub fn update(&self, id: i64, f: impl FnOnce(&mut E)) -> Option<E> {
        self.store.write_with("update", |entries| {
            entries.get_mut(&id).map(|entity| {
                f(entity);
                entity.clone()
            })
        })
    }

    /// Swap the whole projection for `entities` under one write lock.
    pub fn replace_all(&self, entities: impl IntoIterator<Item = E>) -> usize {
        self.store.write_with("replace_all", |entries| {
            entries.clear();
            for entity in entities {
                entries.insert(entity.id(), entity);
            }
            entries.len()
        })
    }

    pub fn flush(&self) -> usize {
        self.store.flush()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

fn record_lookup<E: CatalogEntity>(hit: bool) {
    let name = if hit {
        METRIC_OBJECT_HIT
    } else {
        METRIC_OBJECT_MISS
    };
    counter!(name, "entity" => E::KIND.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use crate::domain::entities::Chair;

    use super::*;

    fn chair(id: i64, stock: i64) -> Chair {
        Chair {
            id,
            name: format!("chair-{id}"),
            description: String::new(),
            thumbnail: String::new(),
            price: 1000 * id,
            height: 100,
            width: 50,
            depth: 50,
            color: "black".to_string(),
            features: String::new(),
            kind: "gaming".to_string(),
            popularity: 0,
            stock,
        }
    }

    #[test]
    fn get_multi_preserves_order_and_skips_missing() {
        let cache = EntityCache::new();
        cache.set_many([chair(1, 1), chair(2, 1), chair(3, 1)]);

        let (found, all) = cache.get_multi(&[3, 1, 2]);
        assert!(all);
        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3, 1, 2]);

        let (found, all) = cache.get_multi(&[2, 99, 1]);
        assert!(!all);
        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 1]);

        let (found, all) = cache.get_multi(&[]);
        assert!(all);
        assert!(found.is_empty());
    }

    #[test]
    fn update_mutates_in_place() {
        let cache = EntityCache::new();
        cache.set(chair(7, 2));

        let updated = cache.update(7, |c| c.stock -= 1).expect("cached chair");
        assert_eq!(updated.stock, 1);
        assert_eq!(cache.get(7).map(|c| c.stock), Some(1));

        assert!(cache.update(8, |c| c.stock -= 1).is_none());
    }

    #[test]
    fn replace_all_drops_previous_projection() {
        let cache = EntityCache::new();
        cache.set_many([chair(1, 1), chair(2, 1)]);

        let loaded = cache.replace_all([chair(5, 1)]);
        assert_eq!(loaded, 1);
        assert!(cache.get(1).is_none());
        assert!(cache.get(5).is_some());

        cache.flush();
        assert!(cache.is_empty());
    }
}
