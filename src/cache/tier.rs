//! Per-entity cache bundle: one entity cache plus one query tier.

use std::sync::Arc;

use bytes::Bytes;
use metrics::counter;
use serde::Serialize;
use tracing::debug;

use crate::domain::entities::{CatalogEntity, Chair, Estate};

use super::config::CacheConfig;
use super::generation::{Generation, GenerationalCache};
use super::keys::{CachedQuery, QuerySignature};
use super::objects::EntityCache;
use super::pool::{BufferPool, PooledBody};

const METRIC_QUERY_HIT: &str = "catalogd_cache_query_hit_total";
const METRIC_QUERY_MISS: &str = "catalogd_cache_query_miss_total";

pub struct CatalogTier<E> {
    objects: EntityCache<E>,
    queries: GenerationalCache<QuerySignature, CachedQuery>,
    pool: Arc<BufferPool>,
    query_cache_enabled: bool,
}

impl<E: CatalogEntity> CatalogTier<E> {
    pub fn new(pool: Arc<BufferPool>, query_cache_enabled: bool) -> Self {
        Self {
            objects: EntityCache::new(),
            queries: GenerationalCache::new(E::KIND.as_str()),
            pool,
            query_cache_enabled,
        }
    }

    pub fn objects(&self) -> &EntityCache<E> {
        &self.objects
    }

    pub fn queries(&self) -> &GenerationalCache<QuerySignature, CachedQuery> {
        &self.queries
    }

    pub fn generation(&self) -> Generation {
        self.queries.generation()
    }

    pub fn lookup_body(&self, signature: &QuerySignature) -> Option<Bytes> {
        self.lookup(signature).and_then(|cached| cached.body())
    }

    pub fn lookup_count(&self, signature: &QuerySignature) -> Option<i64> {
        self.lookup(signature).and_then(|cached| cached.count())
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<PooledBody, serde_json::Error> {
        self.pool.encode(value)
    }

    /// Cache `body` under `signature` if `generation` is still current, with
    /// a release action that returns its buffer to the pool on flush.
    pub fn store_body(
        &self,
        generation: Generation,
        signature: QuerySignature,
        body: &PooledBody,
    ) -> bool {
        if !self.query_cache_enabled {
            return false;
        }
        let release = body.release_to(&self.pool);
        self.queries
            .set_with_cleanup_in_generation(
                generation,
                signature,
                CachedQuery::Body(body.clone()),
                release,
            )
            .is_ok()
    }

    pub fn store_count(&self, generation: Generation, signature: QuerySignature, count: i64) -> bool {
        self.query_cache_enabled
            && self
                .queries
                .set_in_generation(generation, signature, CachedQuery::Count(count))
    }

    /// Drop every cached query of this entity type.
    pub fn flush_queries(&self) -> Generation {
        self.queries.flush()
    }

    /// Drop every cached query and seed the new generation with `body`, which
    /// was built in `generation`. A body built before a concurrent flush is
    /// not seeded.
    pub fn reseed(
        &self,
        generation: Generation,
        signature: QuerySignature,
        body: PooledBody,
    ) -> Generation {
        if !self.query_cache_enabled {
            return self.queries.flush();
        }
        let (next, installed) = self.queries.flush_with_replacement_in_generation(
            generation,
            signature,
            CachedQuery::Body(body),
        );
        if !installed {
            debug!(
                entity = E::KIND.as_str(),
                generation = next,
                "Dropped stale reseed"
            );
        }
        next
    }

    fn lookup(&self, signature: &QuerySignature) -> Option<CachedQuery> {
        if !self.query_cache_enabled {
            return None;
        }
        let found = self.queries.get(signature);
        let name = if found.is_some() {
            METRIC_QUERY_HIT
        } else {
            METRIC_QUERY_MISS
        };
        counter!(name, "entity" => E::KIND.as_str()).increment(1);
        found
    }
}

/// The cache tiers of both entity types, sharing one buffer pool.
#[derive(Clone)]
pub struct CatalogCaches {
    pub chairs: Arc<CatalogTier<Chair>>,
    pub estates: Arc<CatalogTier<Estate>>,
}

impl CatalogCaches {
    pub fn new(config: &CacheConfig) -> Self {
        let pool = Arc::new(BufferPool::new(config.buffer_pool_size, config.buffer_capacity));
        Self {
            chairs: Arc::new(CatalogTier::new(Arc::clone(&pool), config.enable_query_cache)),
            estates: Arc::new(CatalogTier::new(pool, config.enable_query_cache)),
        }
    }
}
