//! Cache configuration.

use serde::Deserialize;

const DEFAULT_BUFFER_POOL_SIZE: usize = 64;
const DEFAULT_BUFFER_CAPACITY: usize = 16 * 1024;

/// Cache tuning from the `[cache]` table of `catalogd.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache search/count/list results. The entity cache is always on.
    pub enable_query_cache: bool,
    /// Maximum idle serialization buffers kept for reuse.
    pub buffer_pool_size: usize,
    /// Initial capacity of a fresh serialization buffer, in bytes.
    pub buffer_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_query_cache: true,
            buffer_pool_size: DEFAULT_BUFFER_POOL_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_query_cache: settings.enable_query_cache,
            buffer_pool_size: settings.buffer_pool_size,
            buffer_capacity: settings.buffer_capacity,
        }
    }
}
