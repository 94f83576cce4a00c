//! catalogd cache system
//!
//! Two tiers per entity type, bundled in [`CatalogTier`]:
//!
//! - **Entity cache** ([`EntityCache`]): every row of the table keyed by id,
//!   preloaded at startup and kept in sync with writes.
//! - **Query tier** ([`GenerationalCache`]): encoded search pages, match
//!   counts and fixed lists, keyed by [`QuerySignature`] and discarded
//!   wholesale whenever a write changes what those queries would return.
//!
//! Cold misses on hot fixed lists are collapsed by a [`CoalescingGroup`].
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enable_query_cache = true
//! buffer_pool_size = 64
//! buffer_capacity = 16384
//! ```

mod coalesce;
mod config;
mod generation;
mod keys;
mod lock;
mod objects;
mod pool;
mod store;
mod tier;

pub use coalesce::CoalescingGroup;
pub use config::CacheConfig;
pub use generation::{Generation, GenerationalCache, Release};
pub use keys::{CachedQuery, QuerySignature};
pub use objects::EntityCache;
pub use pool::{BufferPool, PooledBody};
pub use store::KeyedStore;
pub use tier::{CatalogCaches, CatalogTier};
