//! Postgres-backed repository implementations.

mod chairs;
mod estates;
mod maintenance;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::domain::search::{Predicate, SearchFilter};

/// Rows per INSERT statement during bulk ingestion.
const INSERT_CHUNK: usize = 1000;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Append `WHERE` conditions: `base` (if any) followed by every predicate
    /// of `filter`, all values bound as parameters.
    fn push_conditions(
        qb: &mut QueryBuilder<'_, Postgres>,
        base: Option<&'static str>,
        filter: &SearchFilter,
    ) {
        let mut first = true;

        if let Some(base) = base {
            push_joiner(qb, &mut first);
            qb.push(base);
        }

        for predicate in filter.predicates() {
            match predicate {
                Predicate::Range { column, range } => {
                    if let Some(min) = range.lower() {
                        push_joiner(qb, &mut first);
                        qb.push(*column).push(" >= ").push_bind(min);
                    }
                    if let Some(max) = range.upper() {
                        push_joiner(qb, &mut first);
                        qb.push(*column).push(" < ").push_bind(max);
                    }
                }
                Predicate::Equals { column, value } => {
                    push_joiner(qb, &mut first);
                    qb.push(*column).push(" = ").push_bind(value.clone());
                }
                Predicate::Contains { column, value } => {
                    push_joiner(qb, &mut first);
                    qb.push("strpos(")
                        .push(*column)
                        .push(", ")
                        .push_bind(value.clone())
                        .push(") > 0");
                }
            }
        }
    }
}

fn push_joiner(qb: &mut QueryBuilder<'_, Postgres>, first: &mut bool) {
    qb.push(if *first { " WHERE " } else { " AND " });
    *first = false;
}
