//! Query-tier keys and values.

use std::fmt;

use bytes::Bytes;

use crate::domain::search::{PageWindow, SearchFilter};

use super::pool::PooledBody;

/// Canonical identity of a cacheable query.
///
/// Result and count signatures for the same filter differ only in their
/// prefix and the page window, so a count computed for one page is reused by
/// every other page of the same filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature(String);

impl QuerySignature {
    /// Page of results: filter plus pagination.
    pub fn result(filter: &SearchFilter, window: PageWindow) -> Self {
        Self(format!(
            "page:{}|page={}&perPage={}",
            filter.signature(),
            window.page(),
            window.per_page()
        ))
    }

    /// Total match count: filter only.
    pub fn count(filter: &SearchFilter) -> Self {
        Self(format!("count:{}", filter.signature()))
    }

    pub fn lowest_priced() -> Self {
        Self("lowest_priced".to_string())
    }

    pub fn recommended(chair_id: i64) -> Self {
        Self(format!("recommended:{chair_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value stored in a query tier.
#[derive(Debug, Clone)]
pub enum CachedQuery {
    /// Encoded JSON response body.
    Body(PooledBody),
    /// Number of rows matching a filter.
    Count(i64),
}

impl CachedQuery {
    pub fn body(&self) -> Option<Bytes> {
        match self {
            CachedQuery::Body(body) => Some(body.bytes()),
            CachedQuery::Count(_) => None,
        }
    }

    pub fn count(&self) -> Option<i64> {
        match self {
            CachedQuery::Count(count) => Some(*count),
            CachedQuery::Body(_) => None,
        }
    }
}
