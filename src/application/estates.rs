//! Estate catalog operations.

use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::application::catalog::{CatalogService, Invalidation};
use crate::application::chairs::present;
use crate::application::error::CatalogError;
use crate::application::repos::EstatesRepo;
use crate::cache::{CatalogTier, QuerySignature};
use crate::domain::conditions::EstateSearchCondition;
use crate::domain::entities::{
    AREA_SEARCH_LIMIT, CatalogEntity, Chair, DoorFit, Estate, LIST_LIMIT,
};
use crate::domain::error::DomainError;
use crate::domain::geometry::{Point, Polygon};
use crate::domain::search::{PageWindow, SearchFilter};

/// Raw `/api/estate/search` query. Empty values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstateSearchParams {
    pub door_height_range_id: Option<String>,
    pub door_width_range_id: Option<String>,
    pub rent_range_id: Option<String>,
    pub features: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl EstateSearchParams {
    pub fn to_query(
        &self,
        conditions: &EstateSearchCondition,
    ) -> Result<(SearchFilter, PageWindow), DomainError> {
        let mut filter = SearchFilter::new();

        if let Some(raw) = present(&self.door_height_range_id) {
            filter.range(
                "door_height",
                conditions.door_height.resolve(raw, "doorHeightRangeId")?,
            );
        }
        if let Some(raw) = present(&self.door_width_range_id) {
            filter.range(
                "door_width",
                conditions.door_width.resolve(raw, "doorWidthRangeId")?,
            );
        }
        if let Some(raw) = present(&self.rent_range_id) {
            filter.range("rent", conditions.rent.resolve(raw, "rentRangeId")?);
        }
        if let Some(features) = present(&self.features) {
            filter.contains_each("features", features);
        }

        if filter.is_empty() {
            return Err(DomainError::validation("no estate search condition supplied"));
        }

        let window = PageWindow::parse(present(&self.page), present(&self.per_page))?;
        Ok((filter, window))
    }
}

#[derive(Clone)]
pub struct EstateService {
    catalog: CatalogService<Estate, dyn EstatesRepo>,
    chairs: Arc<CatalogTier<Chair>>,
    conditions: Arc<EstateSearchCondition>,
}

impl EstateService {
    pub fn new(
        tier: Arc<CatalogTier<Estate>>,
        repo: Arc<dyn EstatesRepo>,
        chairs: Arc<CatalogTier<Chair>>,
        conditions: Arc<EstateSearchCondition>,
    ) -> Self {
        Self {
            catalog: CatalogService::new(tier, repo),
            chairs,
            conditions,
        }
    }

    pub fn catalog(&self) -> &CatalogService<Estate, dyn EstatesRepo> {
        &self.catalog
    }

    pub async fn detail(&self, id: i64) -> Result<Estate, CatalogError> {
        self.catalog.detail(id).await
    }

    pub async fn search(&self, params: &EstateSearchParams) -> Result<Bytes, CatalogError> {
        let (filter, window) = params.to_query(&self.conditions)?;
        self.catalog.search(&filter, window).await
    }

    pub async fn lowest_priced(&self) -> Result<Bytes, CatalogError> {
        self.catalog.lowest_priced().await
    }

    pub async fn ingest_csv(&self, data: &[u8]) -> Result<usize, CatalogError> {
        self.catalog.ingest_csv(data, Invalidation::Flush).await
    }

    /// Succeeds when the estate exists.
    pub async fn request_document(&self, id: i64) -> Result<(), CatalogError> {
        self.catalog.detail(id).await.map(|_| ())
    }

    /// Estates whose door admits the chair, most popular first.
    ///
    /// The chair must be known to the chair cache; an unknown chair is a bad
    /// request rather than a missing resource.
    pub async fn recommended_for_chair(&self, chair_id: i64) -> Result<Bytes, CatalogError> {
        let chair = self.chairs.objects().get(chair_id).ok_or_else(|| {
            CatalogError::invalid_input(format!("chair {chair_id} is not in the catalog"))
        })?;
        let fit = DoorFit::for_chair(&chair);

        self.catalog
            .cached_list(
                QuerySignature::recommended(chair_id),
                move |tier, repo| async move {
                    let ids = repo.recommended_ids(fit, LIST_LIMIT).await?;
                    let (items, _) = tier.objects().get_multi(&ids);
                    Ok(tier.encode(&Estate::list_page(items))?)
                },
            )
            .await
    }

    /// Estates inside a drawn polygon, at most [`AREA_SEARCH_LIMIT`].
    ///
    /// The store narrows candidates to the polygon's bounding box; the exact
    /// containment test runs here. Results are not cached.
    pub async fn search_area(&self, polygon: &Polygon) -> Result<Bytes, CatalogError> {
        let bounds = polygon.bounding_box();
        let candidates = self.catalog.repo().ids_in_bounding_box(bounds).await?;
        let (estates, _) = self.catalog.tier().objects().get_multi(&candidates);

        let inside: Vec<Estate> = estates
            .into_iter()
            .filter(|estate| {
                polygon.contains(Point {
                    latitude: estate.latitude,
                    longitude: estate.longitude,
                })
            })
            .take(AREA_SEARCH_LIMIT)
            .collect();
        debug!(
            candidates = candidates.len(),
            matched = inside.len(),
            "Area search complete"
        );

        let count = inside.len() as i64;
        let body = serde_json::to_vec(&Estate::search_page(count, inside))?;
        Ok(Bytes::from(body))
    }
}
