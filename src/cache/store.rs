//! Cache Store Module
//!
//! Main cache engine: one table from key to in-flight or settled query,
//! request deduplication, and TTL-driven eviction scheduling.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::entry::{await_settled, QueryEntry};
use crate::cache::CacheStats;
use crate::config::CacheConfig;
use crate::error::Result;

// == Query Options ==
/// Per-call caching options for [`QueryCache::fetch_or_create`].
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Whether the created entry may be inserted into the table
    pub cache: bool,
    /// Time-to-live override; `None` uses the configured default and
    /// `Duration::ZERO` disables expiry entirely
    pub ttl: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            cache: true,
            ttl: None,
        }
    }
}

impl QueryOptions {
    /// Compute once, hand the result to the caller, cache nothing.
    pub fn uncached() -> Self {
        Self {
            cache: false,
            ttl: None,
        }
    }

    /// Cache with an explicit time-to-live.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: true,
            ttl: Some(ttl),
        }
    }

    /// Cache without a deadline; only explicit invalidation removes the entry.
    pub fn no_expiry() -> Self {
        Self {
            cache: true,
            ttl: Some(Duration::ZERO),
        }
    }
}

// == Invalidation ==
/// One item of an invalidation batch.
#[derive(Debug, Clone)]
pub struct Invalidation {
    /// Key to invalidate
    pub key: String,
    /// Removal delay; `None` or zero removes immediately
    pub after: Option<Duration>,
}

impl Invalidation {
    /// Immediate removal of `key`.
    pub fn now(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            after: None,
        }
    }

    /// Deferred removal of `key` once `delay` elapses.
    pub fn after(key: impl Into<String>, delay: Duration) -> Self {
        Self {
            key: key.into(),
            after: Some(delay),
        }
    }
}

// == Query Cache ==
/// Key-addressed cache for asynchronous computations.
///
/// Concurrent fetches for one key share a single computation; settled
/// values are memoized until their time-to-live elapses or the key is
/// explicitly invalidated. Cloning the handle shares the same table, so one
/// cache can be handed to many tasks; independent instances stay fully
/// isolated from each other.
pub struct QueryCache<V> {
    inner: Arc<CacheInner<V>>,
}

struct CacheInner<V> {
    table: RwLock<Table<V>>,
    config: CacheConfig,
}

struct Table<V> {
    entries: HashMap<String, QueryEntry<V>>,
    stats: CacheStats,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                table: RwLock::new(Table {
                    entries: HashMap::new(),
                    stats: CacheStats::new(),
                }),
                config,
            }),
        }
    }

    /// Creates a cache with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    // == Fetch Or Create ==
    /// Returns the value for `key`, computing it when no entry exists.
    ///
    /// On a miss, `factory` is invoked exactly once and its computation is
    /// spawned immediately; every concurrent caller for the same key awaits
    /// that single computation. When the entry has already settled the
    /// value is returned without waiting. For an existing key, `factory`
    /// and `options` are ignored entirely.
    ///
    /// The new entry is inserted only when `options.cache` is true and the
    /// table is below capacity; otherwise the computation still runs and
    /// the caller still gets its result, but nothing is cached. A failed
    /// computation stays in the table and re-surfaces the same error to
    /// every caller until the key is invalidated.
    ///
    /// # Arguments
    /// * `key` - Cache key
    /// * `factory` - Invoked only when no entry exists for `key`
    /// * `options` - Insertion and time-to-live controls
    pub async fn fetch_or_create<F, Fut>(
        &self,
        key: &str,
        factory: F,
        options: QueryOptions,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let rx = {
            let mut guard = self.inner.table.write().await;
            let table = &mut *guard;

            if let Some(entry) = table.entries.get(key) {
                if entry.is_settled() {
                    table.stats.record_hit();
                } else {
                    table.stats.record_coalesced();
                }
                entry.subscribe()
            } else {
                table.stats.record_miss();
                let mut entry = QueryEntry::spawn(factory());
                let rx = entry.subscribe();

                if options.cache && table.entries.len() < self.inner.config.max_entries {
                    let ttl = options.ttl.unwrap_or(self.inner.config.default_ttl);
                    if !ttl.is_zero() {
                        let deadline = Instant::now() + ttl;
                        entry.replace_eviction(deadline, self.spawn_eviction(key, deadline));
                    }
                    debug!(key, ttl_ms = ttl.as_millis() as u64, "created cache entry");
                    table.entries.insert(key.to_string(), entry);
                    let total = table.entries.len();
                    table.stats.set_total_entries(total);
                } else {
                    table.stats.record_uncached();
                    debug!(key, "caching disabled or table full, computing without insert");
                }
                rx
            }
        };

        await_settled(rx).await
    }

    // == Mutate ==
    /// Replaces the settled value for `key` with `updater(value)`.
    ///
    /// No-op when the key is absent or the computation has not settled
    /// successfully. Expiry and scheduled eviction are untouched.
    pub async fn mutate<F>(&self, key: &str, updater: F)
    where
        F: FnOnce(V) -> V,
    {
        let table = self.inner.table.read().await;
        if let Some(entry) = table.entries.get(key) {
            entry.mutate(updater);
        }
    }

    // == Invalidate Batch ==
    /// Invalidates each listed key independently.
    ///
    /// A key with a positive delay is kept until the delay elapses, its
    /// prior scheduled eviction replaced by the new deadline; any other key
    /// is removed immediately. Absent keys are skipped, and no key blocks
    /// the processing of the others.
    pub async fn invalidate_batch(&self, queries: &[Invalidation]) {
        let mut table = self.inner.table.write().await;
        for query in queries {
            match query.after {
                Some(delay) if !delay.is_zero() => {
                    let Some(entry) = table.entries.get_mut(&query.key) else {
                        continue;
                    };
                    let deadline = Instant::now() + delay;
                    let handle = self.spawn_eviction(&query.key, deadline);
                    entry.replace_eviction(deadline, handle);
                    debug!(
                        key = %query.key,
                        delay_ms = delay.as_millis() as u64,
                        "deferred invalidation scheduled"
                    );
                }
                _ => {
                    if table.entries.remove(&query.key).is_some() {
                        let total = table.entries.len();
                        table.stats.set_total_entries(total);
                        debug!(key = %query.key, "invalidated entry");
                    }
                }
            }
        }
    }

    // == Extend TTL ==
    /// Pushes back the expiry for `key` by `extra`.
    ///
    /// A deadline still in the future is extended from that deadline; an
    /// elapsed or missing deadline restarts from now. No-op when the entry
    /// is absent or `extra` is zero.
    pub async fn extend_ttl(&self, key: &str, extra: Duration) {
        if extra.is_zero() {
            return;
        }
        let mut table = self.inner.table.write().await;
        let Some(entry) = table.entries.get_mut(key) else {
            return;
        };
        let deadline = extended_deadline(entry.expires_at(), Instant::now(), extra);
        let handle = self.spawn_eviction(key, deadline);
        entry.replace_eviction(deadline, handle);
        debug!(key, extra_ms = extra.as_millis() as u64, "extended entry ttl");
    }

    // == Clear ==
    /// Removes every entry and cancels every scheduled eviction.
    pub async fn clear(&self) {
        let mut table = self.inner.table.write().await;
        let removed = table.entries.len();
        table.entries.clear();
        table.stats.set_total_entries(0);
        if removed > 0 {
            debug!(removed, "cleared all entries");
        }
    }

    // == Stats ==
    /// Returns a snapshot of cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let table = self.inner.table.read().await;
        let mut stats = table.stats.clone();
        stats.set_total_entries(table.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of cached entries.
    pub async fn len(&self) -> usize {
        self.inner.table.read().await.entries.len()
    }

    // == Is Empty ==
    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.inner.table.read().await.entries.is_empty()
    }

    // == Contains Key ==
    /// Returns true if `key` currently has an entry, settled or pending.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.inner.table.read().await.entries.contains_key(key)
    }

    // == TTL Remaining ==
    /// Remaining time until eviction for `key`.
    ///
    /// Returns `None` when the entry is absent or has no deadline; an
    /// elapsed deadline reports as zero.
    pub async fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let table = self.inner.table.read().await;
        let deadline = table.entries.get(key)?.expires_at()?;
        Some(deadline.saturating_duration_since(Instant::now()))
    }

    // == Eviction Scheduling ==
    /// Schedules removal of `key` at `deadline`.
    ///
    /// Shared by TTL insertion, extension, and deferred invalidation; the
    /// caller is responsible for installing the returned handle on the
    /// entry so the previous one is aborted.
    fn spawn_eviction(&self, key: &str, deadline: Instant) -> JoinHandle<()> {
        let key = key.to_string();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let mut table = inner.table.write().await;
            if table.entries.remove(&key).is_some() {
                table.stats.record_eviction();
                let total = table.entries.len();
                table.stats.set_total_entries(total);
                debug!(key = %key, "evicted expired entry");
            }
        })
    }
}

// == Deadline Selection ==
/// Picks the new expiry for an extension: a deadline still in the future
/// compounds, an elapsed or missing deadline restarts from `now`.
fn extended_deadline(current: Option<Instant>, now: Instant, extra: Duration) -> Instant {
    match current {
        Some(deadline) if deadline > now => deadline + extra,
        _ => now + extra,
    }
}
