use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use crate::{
    application::repos::{CatalogRepo, ChairsRepo, RepoError},
    domain::{
        entities::Chair,
        search::{PageWindow, SearchFilter},
    },
};

use super::{INSERT_CHUNK, PostgresRepositories, map_sqlx_error};

/// Only chairs with stock left are searchable or listed.
const IN_STOCK: &str = "stock > 0";

#[async_trait]
impl CatalogRepo<Chair> for PostgresRepositories {
    async fn load_all(&self) -> Result<Vec<Chair>, RepoError> {
        sqlx::query_as::<_, Chair>("SELECT * FROM chair")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Chair>, RepoError> {
        sqlx::query_as::<_, Chair>("SELECT * FROM chair WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_matching(&self, filter: &SearchFilter) -> Result<i64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM chair");
        Self::push_conditions(&mut qb, Some(IN_STOCK), filter);
        qb.build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn matching_ids(
        &self,
        filter: &SearchFilter,
        window: PageWindow,
    ) -> Result<Vec<i64>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM chair");
        Self::push_conditions(&mut qb, Some(IN_STOCK), filter);
        qb.push(" ORDER BY popularity DESC, id ASC LIMIT ")
            .push_bind(window.limit())
            .push(" OFFSET ")
            .push_bind(window.offset());
        qb.build_query_scalar::<i64>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn lowest_priced_ids(&self, limit: i64) -> Result<Vec<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM chair WHERE stock > 0 ORDER BY price ASC, id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_batch(&self, records: Vec<Chair>) -> Result<Vec<Chair>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut stored = Vec::with_capacity(records.len());

        for chunk in records.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO chair (id, name, description, thumbnail, price, height, width, \
                 depth, color, features, kind, popularity, stock) ",
            );
            qb.push_values(chunk, |mut row, chair| {
                row.push_bind(chair.id)
                    .push_bind(chair.name.clone())
                    .push_bind(chair.description.clone())
                    .push_bind(chair.thumbnail.clone())
                    .push_bind(chair.price)
                    .push_bind(chair.height)
                    .push_bind(chair.width)
                    .push_bind(chair.depth)
                    .push_bind(chair.color.clone())
                    .push_bind(chair.features.clone())
                    .push_bind(chair.kind.clone())
                    .push_bind(chair.popularity)
                    .push_bind(chair.stock);
            });
            qb.push(" RETURNING *");

            let rows = qb
                .build_query_as::<Chair>()
                .fetch_all(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            stored.extend(rows);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(rows = stored.len(), "Inserted chair batch");
        Ok(stored)
    }
}

#[async_trait]
impl ChairsRepo for PostgresRepositories {
    async fn decrement_stock(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("UPDATE chair SET stock = stock - 1 WHERE id = $1 AND stock > 0")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
