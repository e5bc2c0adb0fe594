//! Query Cache - key-addressed memoization for asynchronous computations
//!
//! Deduplicates concurrent fetches for the same key, memoizes settled
//! results for a bounded time-to-live, and exposes primitives to mutate,
//! invalidate, or extend cached entries.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStats, Invalidation, QueryCache, QueryOptions};
pub use config::CacheConfig;
pub use error::{QueryError, Result};
