//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{Chair, DoorFit, Estate};
use crate::domain::geometry::BoundingBox;
use crate::domain::search::{PageWindow, SearchFilter};

#[derive(Debug, Clone, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Read and bulk-write access shared by both catalog tables.
///
/// Searches only ever see rows a client could act on; for chairs that means
/// rows with stock left.
#[async_trait]
pub trait CatalogRepo<E>: Send + Sync {
    async fn load_all(&self) -> Result<Vec<E>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<E>, RepoError>;

    async fn count_matching(&self, filter: &SearchFilter) -> Result<i64, RepoError>;

    /// Ids ordered by popularity descending, then id ascending.
    async fn matching_ids(
        &self,
        filter: &SearchFilter,
        window: PageWindow,
    ) -> Result<Vec<i64>, RepoError>;

    /// Ids ordered by price (chairs) or rent (estates) ascending, then id.
    async fn lowest_priced_ids(&self, limit: i64) -> Result<Vec<i64>, RepoError>;

    /// Insert every record in one transaction and return the stored rows.
    /// Nothing is written when any record fails.
    async fn insert_batch(&self, records: Vec<E>) -> Result<Vec<E>, RepoError>;
}

#[async_trait]
pub trait ChairsRepo: CatalogRepo<Chair> {
    /// Take one unit of stock. `false` when the chair is missing or sold out.
    async fn decrement_stock(&self, id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait EstatesRepo: CatalogRepo<Estate> {
    /// Estates whose door admits a chair with the given two smallest
    /// dimensions, most popular first.
    async fn recommended_ids(&self, fit: DoorFit, limit: i64) -> Result<Vec<i64>, RepoError>;

    /// Estates located inside `bounds`, most popular first.
    async fn ids_in_bounding_box(&self, bounds: BoundingBox) -> Result<Vec<i64>, RepoError>;
}

/// A named SQL script executed during reinitialization.
#[derive(Debug, Clone)]
pub struct SqlScript {
    pub name: String,
    pub sql: String,
}

#[async_trait]
pub trait MaintenanceRepo: Send + Sync {
    /// Run `scripts` in order, stopping at the first failure.
    async fn reset(&self, scripts: &[SqlScript]) -> Result<(), RepoError>;
}
