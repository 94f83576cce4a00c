//! Chair catalog operations.

use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use tracing::info;

use crate::application::catalog::{CatalogService, Invalidation};
use crate::application::error::CatalogError;
use crate::application::repos::ChairsRepo;
use crate::cache::CatalogTier;
use crate::domain::conditions::ChairSearchCondition;
use crate::domain::entities::Chair;
use crate::domain::error::DomainError;
use crate::domain::search::{PageWindow, SearchFilter};

/// Raw `/api/chair/search` query. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChairSearchParams {
    pub price_range_id: Option<String>,
    pub height_range_id: Option<String>,
    pub width_range_id: Option<String>,
    pub depth_range_id: Option<String>,
    pub kind: Option<String>,
    pub color: Option<String>,
    pub features: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ChairSearchParams {
    pub fn to_query(
        &self,
        conditions: &ChairSearchCondition,
    ) -> Result<(SearchFilter, PageWindow), DomainError> {
        let mut filter = SearchFilter::new();

        if let Some(raw) = present(&self.price_range_id) {
            filter.range("price", conditions.price.resolve(raw, "priceRangeId")?);
        }
        if let Some(raw) = present(&self.height_range_id) {
            filter.range("height", conditions.height.resolve(raw, "heightRangeId")?);
        }
        if let Some(raw) = present(&self.width_range_id) {
            filter.range("width", conditions.width.resolve(raw, "widthRangeId")?);
        }
        if let Some(raw) = present(&self.depth_range_id) {
            filter.range("depth", conditions.depth.resolve(raw, "depthRangeId")?);
        }
        if let Some(kind) = present(&self.kind) {
            filter.equals("kind", kind);
        }
        if let Some(color) = present(&self.color) {
            filter.equals("color", color);
        }
        if let Some(features) = present(&self.features) {
            filter.contains_each("features", features);
        }

        if filter.is_empty() {
            return Err(DomainError::validation("no chair search condition supplied"));
        }

        let window = PageWindow::parse(present(&self.page), present(&self.per_page))?;
        Ok((filter, window))
    }
}

pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|raw| !raw.trim().is_empty())
}

#[derive(Clone)]
pub struct ChairService {
    catalog: CatalogService<Chair, dyn ChairsRepo>,
    conditions: Arc<ChairSearchCondition>,
}

impl ChairService {
    pub fn new(
        tier: Arc<CatalogTier<Chair>>,
        repo: Arc<dyn ChairsRepo>,
        conditions: Arc<ChairSearchCondition>,
    ) -> Self {
        Self {
            catalog: CatalogService::new(tier, repo),
            conditions,
        }
    }

    pub fn catalog(&self) -> &CatalogService<Chair, dyn ChairsRepo> {
        &self.catalog
    }

    /// A chair that is sold out is reported as missing.
    pub async fn detail(&self, id: i64) -> Result<Chair, CatalogError> {
        let chair = self.catalog.detail(id).await?;
        if chair.stock <= 0 {
            return Err(CatalogError::not_found("chair"));
        }
        Ok(chair)
    }

    pub async fn search(&self, params: &ChairSearchParams) -> Result<Bytes, CatalogError> {
        let (filter, window) = params.to_query(&self.conditions)?;
        self.catalog.search(&filter, window).await
    }

    pub async fn lowest_priced(&self) -> Result<Bytes, CatalogError> {
        self.catalog.lowest_priced().await
    }

    pub async fn ingest_csv(&self, data: &[u8]) -> Result<usize, CatalogError> {
        self.catalog
            .ingest_csv(data, Invalidation::ReseedLowestPriced)
            .await
    }

    /// Take one unit of stock.
    ///
    /// The entity cache is updated before the query tier is flushed, so the
    /// purchase is visible to the buyer's next read.
    pub async fn buy(&self, id: i64) -> Result<(), CatalogError> {
        let repo = self.catalog.repo();
        if !repo.decrement_stock(id).await? {
            return Err(CatalogError::not_found("chair"));
        }

        let objects = self.catalog.tier().objects();
        let remaining = match objects.update(id, |chair| chair.stock -= 1) {
            Some(chair) => Some(chair.stock),
            None => match repo.find_by_id(id).await? {
                Some(chair) => {
                    let stock = chair.stock;
                    objects.set(chair);
                    Some(stock)
                }
                None => None,
            },
        };
        self.catalog.invalidate_queries();

        info!(chair_id = id, remaining = ?remaining, "Chair purchased");
        Ok(())
    }
}
