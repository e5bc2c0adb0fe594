//! Cache Module
//!
//! Provides key-addressed memoization of asynchronous computations with
//! request deduplication and TTL expiration.

use std::time::Duration;

mod entry;
mod stats;
mod store;


// Re-export public types
pub use stats::CacheStats;
pub use store::{Invalidation, QueryCache, QueryOptions};

// == Public Constants ==
/// Default capacity bound for the table
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default time-to-live for cached entries
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);
