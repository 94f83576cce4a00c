//! Cache orchestration shared by both catalog entity types.
//!
//! Every read goes entity cache → query tier → store, and every write
//! updates the entity cache before discarding the query tier, so a client
//! that saw its write acknowledged never reads a response computed before
//! it.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use metrics::histogram;
use tracing::{debug, info, warn};

use crate::application::error::CatalogError;
use crate::application::ingest::{CsvRecord, parse_csv};
use crate::application::repos::{CatalogRepo, RepoError};
use crate::cache::{CatalogTier, CoalescingGroup, Generation, PooledBody, QuerySignature};
use crate::domain::entities::{CatalogEntity, LIST_LIMIT};
use crate::domain::search::{PageWindow, SearchFilter};

const METRIC_SEARCH_MS: &str = "catalogd_search_ms";

/// What a committed insert batch does to the query tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Discard every cached query.
    Flush,
    /// Discard every cached query and seed the next generation with a
    /// freshly computed lowest-priced list, so the hottest list never goes
    /// cold after a write.
    ReseedLowestPriced,
}

type ListFlights = CoalescingGroup<(QuerySignature, Generation), Bytes, CatalogError>;

pub struct CatalogService<E, R: ?Sized> {
    tier: Arc<CatalogTier<E>>,
    repo: Arc<R>,
    lists: Arc<ListFlights>,
}

impl<E, R: ?Sized> Clone for CatalogService<E, R> {
    fn clone(&self) -> Self {
        Self {
            tier: Arc::clone(&self.tier),
            repo: Arc::clone(&self.repo),
            lists: Arc::clone(&self.lists),
        }
    }
}

impl<E, R> CatalogService<E, R>
where
    E: CatalogEntity,
    R: CatalogRepo<E> + ?Sized + 'static,
{
    pub fn new(tier: Arc<CatalogTier<E>>, repo: Arc<R>) -> Self {
        Self {
            tier,
            repo,
            lists: Arc::new(CoalescingGroup::new(E::KIND.as_str())),
        }
    }

    pub fn tier(&self) -> &Arc<CatalogTier<E>> {
        &self.tier
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    /// Entity cache first; a store hit populates the cache.
    pub async fn detail(&self, id: i64) -> Result<E, CatalogError> {
        if let Some(entity) = self.tier.objects().get(id) {
            return Ok(entity);
        }
        match self.repo.find_by_id(id).await? {
            Some(entity) => {
                self.tier.objects().set(entity.clone());
                Ok(entity)
            }
            None => Err(CatalogError::not_found(E::KIND.as_str())),
        }
    }

    /// Paginated search, served from the query tier when possible.
    pub async fn search(
        &self,
        filter: &SearchFilter,
        window: PageWindow,
    ) -> Result<Bytes, CatalogError> {
        let started = Instant::now();
        let result_signature = QuerySignature::result(filter, window);
        if let Some(body) = self.tier.lookup_body(&result_signature) {
            record_search(E::KIND.as_str(), "hit", started);
            return Ok(body);
        }

        let generation = self.tier.generation();
        let count = self.count(filter, generation);
        let ids = self.repo.matching_ids(filter, window);
        let (count, ids) = tokio::join!(count, ids);
        let ids = ids?;
        let count = count?;

        let (items, complete) = self.tier.objects().get_multi(&ids);
        if !complete {
            debug!(
                entity = E::KIND.as_str(),
                requested = ids.len(),
                hydrated = items.len(),
                "Search hydrated a partial page"
            );
        }

        let body = self.tier.encode(&E::search_page(count, items))?;
        self.tier.store_body(generation, result_signature, &body);
        record_search(E::KIND.as_str(), "miss", started);
        Ok(body.bytes())
    }

    /// The cheapest listings, at most [`LIST_LIMIT`].
    pub async fn lowest_priced(&self) -> Result<Bytes, CatalogError> {
        self.cached_list(QuerySignature::lowest_priced(), |tier, repo| async move {
            build_lowest_priced(&tier, repo.as_ref()).await
        })
        .await
    }

    /// Serve a fixed list from the query tier, or build it once for all
    /// concurrent callers and cache it in the generation it was built in.
    pub(crate) async fn cached_list<F, Fut>(
        &self,
        signature: QuerySignature,
        build: F,
    ) -> Result<Bytes, CatalogError>
    where
        F: FnOnce(Arc<CatalogTier<E>>, Arc<R>) -> Fut,
        Fut: Future<Output = Result<PooledBody, CatalogError>> + Send + 'static,
    {
        if let Some(body) = self.tier.lookup_body(&signature) {
            return Ok(body);
        }

        let generation = self.tier.generation();
        let tier = Arc::clone(&self.tier);
        let work = build(Arc::clone(&self.tier), Arc::clone(&self.repo));
        let key = (signature.clone(), generation);
        self.lists
            .run(key, move || async move {
                let body = work.await?;
                tier.store_body(generation, signature, &body);
                Ok(body.bytes())
            })
            .await
    }

    /// Parse a CSV upload and insert it.
    pub async fn ingest_csv(
        &self,
        data: &[u8],
        invalidation: Invalidation,
    ) -> Result<usize, CatalogError>
    where
        E: CsvRecord,
    {
        let records = parse_csv::<E>(data)?;
        self.ingest(records, invalidation).await
    }

    /// Insert `records` in one transaction, then bring both tiers up to date.
    /// A failed insert leaves the caches untouched.
    pub async fn ingest(
        &self,
        records: Vec<E>,
        invalidation: Invalidation,
    ) -> Result<usize, CatalogError> {
        if records.is_empty() {
            debug!(entity = E::KIND.as_str(), "Empty catalog batch, nothing to insert");
            return Ok(0);
        }
        let stored = self.repo.insert_batch(records).await?;
        let inserted = stored.len();
        self.tier.objects().set_many(stored);

        let generation = match invalidation {
            Invalidation::Flush => self.tier.flush_queries(),
            Invalidation::ReseedLowestPriced => {
                let built_in = self.tier.generation();
                match build_lowest_priced(&self.tier, self.repo.as_ref()).await {
                    Ok(body) => self
                        .tier
                        .reseed(built_in, QuerySignature::lowest_priced(), body),
                    Err(err) => {
                        warn!(
                            entity = E::KIND.as_str(),
                            error = %err,
                            "Could not rebuild lowest-priced list after insert"
                        );
                        self.tier.flush_queries()
                    }
                }
            }
        };

        info!(
            entity = E::KIND.as_str(),
            inserted,
            generation,
            "Ingested catalog batch"
        );
        Ok(inserted)
    }

    /// Replace the entity cache with a full load and discard every query.
    pub async fn reload(&self) -> Result<usize, CatalogError> {
        let all = self.repo.load_all().await?;
        let loaded = self.tier.objects().replace_all(all);
        self.tier.flush_queries();
        info!(entity = E::KIND.as_str(), loaded, "Loaded entity cache");
        Ok(loaded)
    }

    /// Discard every cached query of this entity type.
    pub fn invalidate_queries(&self) -> Generation {
        self.tier.flush_queries()
    }

    async fn count(&self, filter: &SearchFilter, generation: Generation) -> Result<i64, RepoError> {
        let signature = QuerySignature::count(filter);
        if let Some(count) = self.tier.lookup_count(&signature) {
            return Ok(count);
        }
        let count = self.repo.count_matching(filter).await?;
        self.tier.store_count(generation, signature, count);
        Ok(count)
    }
}

async fn build_lowest_priced<E, R>(tier: &CatalogTier<E>, repo: &R) -> Result<PooledBody, CatalogError>
where
    E: CatalogEntity,
    R: CatalogRepo<E> + ?Sized,
{
    let ids = repo.lowest_priced_ids(LIST_LIMIT).await?;
    let (items, _) = tier.objects().get_multi(&ids);
    Ok(tier.encode(&E::list_page(items))?)
}

fn record_search(entity: &'static str, outcome: &'static str, started: Instant) {
    histogram!(METRIC_SEARCH_MS, "entity" => entity, "cache" => outcome)
        .record(started.elapsed().as_secs_f64() * 1000.0);
}
