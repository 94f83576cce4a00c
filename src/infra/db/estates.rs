use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

use crate::{
    application::repos::{CatalogRepo, EstatesRepo, RepoError},
    domain::{
        entities::{DoorFit, Estate},
        geometry::BoundingBox,
        search::{PageWindow, SearchFilter},
    },
};

use super::{INSERT_CHUNK, PostgresRepositories, map_sqlx_error};

#[async_trait]
impl CatalogRepo<Estate> for PostgresRepositories {
    async fn load_all(&self) -> Result<Vec<Estate>, RepoError> {
        sqlx::query_as::<_, Estate>("SELECT * FROM estate")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Estate>, RepoError> {
        sqlx::query_as::<_, Estate>("SELECT * FROM estate WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_matching(&self, filter: &SearchFilter) -> Result<i64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM estate");
        Self::push_conditions(&mut qb, None, filter);
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
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM estate");
        Self::push_conditions(&mut qb, None, filter);
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
        sqlx::query_scalar::<_, i64>("SELECT id FROM estate ORDER BY rent ASC, id ASC LIMIT $1")
            .bind(limit)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert_batch(&self, records: Vec<Estate>) -> Result<Vec<Estate>, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut stored = Vec::with_capacity(records.len());

        for chunk in records.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO estate (id, name, description, thumbnail, address, latitude, \
                 longitude, rent, door_height, door_width, features, popularity) ",
            );
            qb.push_values(chunk, |mut row, estate| {
                row.push_bind(estate.id)
                    .push_bind(estate.name.clone())
                    .push_bind(estate.description.clone())
                    .push_bind(estate.thumbnail.clone())
                    .push_bind(estate.address.clone())
                    .push_bind(estate.latitude)
                    .push_bind(estate.longitude)
                    .push_bind(estate.rent)
                    .push_bind(estate.door_height)
                    .push_bind(estate.door_width)
                    .push_bind(estate.features.clone())
                    .push_bind(estate.popularity);
            });
            qb.push(" RETURNING *");

            let rows = qb
                .build_query_as::<Estate>()
                .fetch_all(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            stored.extend(rows);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(rows = stored.len(), "Inserted estate batch");
        Ok(stored)
    }
}

#[async_trait]
impl EstatesRepo for PostgresRepositories {
    async fn recommended_ids(&self, fit: DoorFit, limit: i64) -> Result<Vec<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM estate
            WHERE (door_width >= $1 AND door_height >= $2)
               OR (door_width >= $2 AND door_height >= $1)
            ORDER BY popularity DESC, id ASC
            LIMIT $3
            "#,
        )
        .bind(fit.shortest)
        .bind(fit.middle)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn ids_in_bounding_box(&self, bounds: BoundingBox) -> Result<Vec<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM estate
            WHERE latitude BETWEEN $1 AND $2
              AND longitude BETWEEN $3 AND $4
            ORDER BY popularity DESC, id ASC
            "#,
        )
        .bind(bounds.top_left.latitude)
        .bind(bounds.bottom_right.latitude)
        .bind(bounds.top_left.longitude)
        .bind(bounds.bottom_right.longitude)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
