//! Configuration Module
//!
//! Handles loading cache parameters from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL};

/// Cache construction parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries the table may hold
    pub max_entries: usize,
    /// Time-to-live applied when a fetch does not specify one;
    /// zero means entries never expire
    pub default_ttl: Duration,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `QUERY_CACHE_MAX_ENTRIES` - Maximum cached entries (default: 100)
    /// - `QUERY_CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    pub fn from_env() -> Self {
        Self {
            max_entries: env::var("QUERY_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_ENTRIES),
            default_ttl: env::var("QUERY_CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TTL),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl: DEFAULT_TTL,
        }
    }
}
