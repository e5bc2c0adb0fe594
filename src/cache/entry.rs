//! Cache Entry Module
//!
//! Defines the per-key entry: the settlement state of an asynchronous
//! computation plus its expiry bookkeeping.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{QueryError, Result};

// == Query State ==
/// Settlement state of a cached computation.
///
/// An explicit tagged state rather than an `Option<V>` so that settled
/// values like `0`, `""` or `false` are never mistaken for "still pending".
#[derive(Debug, Clone)]
pub(crate) enum QueryState<V> {
    /// Computation spawned, nothing produced yet
    Pending,
    /// Computation produced a value (replaceable later via mutate)
    Settled(V),
    /// Computation failed; the error re-surfaces to every caller
    Failed(QueryError),
}

impl<V> QueryState<V> {
    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, QueryState::Pending)
    }
}

// == Query Entry ==
/// One cached query: the channel its computation settles through, and the
/// optional expiry deadline with its scheduled eviction.
///
/// Dropping the entry aborts the scheduled eviction, so removal from the
/// table through any path also cancels the pending timer.
pub(crate) struct QueryEntry<V> {
    /// Settlement channel; the computation task holds the other handle
    settle: Arc<watch::Sender<QueryState<V>>>,
    /// Absolute deadline; None = never auto-evicted by time
    expires_at: Option<Instant>,
    /// Scheduled eviction; at most one outstanding per entry
    eviction: Option<JoinHandle<()>>,
}

impl<V> QueryEntry<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Spawns `computation` immediately and returns the entry observing it.
    ///
    /// The spawned task settles the channel exactly once. The entry may be
    /// removed from the table before that happens; settling the orphaned
    /// channel is harmless and must not panic.
    pub(crate) fn spawn<Fut>(computation: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let (settle, _) = watch::channel(QueryState::Pending);
        let settle = Arc::new(settle);

        let task_settle = Arc::clone(&settle);
        tokio::spawn(async move {
            let outcome = match computation.await {
                Ok(value) => QueryState::Settled(value),
                Err(err) => QueryState::Failed(QueryError::computation(err)),
            };
            task_settle.send_replace(outcome);
        });

        Self {
            settle,
            expires_at: None,
            eviction: None,
        }
    }

    // == Subscribe ==
    /// Returns a receiver observing this entry's settlement.
    pub(crate) fn subscribe(&self) -> watch::Receiver<QueryState<V>> {
        self.settle.subscribe()
    }

    // == Is Settled ==
    /// Returns true once the computation has settled (value or failure).
    pub(crate) fn is_settled(&self) -> bool {
        !self.settle.borrow().is_pending()
    }

    // == Mutate ==
    /// Replaces a settled value with `updater(value)`.
    ///
    /// No-op while the computation is pending or failed.
    pub(crate) fn mutate<F>(&self, updater: F)
    where
        F: FnOnce(V) -> V,
    {
        self.settle.send_if_modified(|state| match state {
            QueryState::Settled(value) => {
                *value = updater(value.clone());
                true
            }
            _ => false,
        });
    }

    // == Expires At ==
    /// Returns the absolute expiry deadline, if one is set.
    pub(crate) fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    // == Replace Eviction ==
    /// Installs a new deadline and its scheduled eviction, aborting any
    /// previous one. Single code path for TTL insertion, extension, and
    /// deferred invalidation.
    pub(crate) fn replace_eviction(&mut self, deadline: Instant, handle: JoinHandle<()>) {
        if let Some(previous) = self.eviction.take() {
            previous.abort();
        }
        self.expires_at = Some(deadline);
        self.eviction = Some(handle);
    }
}

impl<V> Drop for QueryEntry<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.eviction.take() {
            handle.abort();
        }
    }
}

// == Await Settled ==
/// Waits until the observed computation settles and returns its outcome.
///
/// Returns immediately when the entry has already settled. Fails with
/// [`QueryError::Abandoned`] when every settlement handle is gone without a
/// value having been produced.
pub(crate) async fn await_settled<V>(mut rx: watch::Receiver<QueryState<V>>) -> Result<V>
where
    V: Clone,
{
    let state = rx
        .wait_for(|state| !state.is_pending())
        .await
        .map_err(|_| QueryError::Abandoned)?;
    match &*state {
        QueryState::Settled(value) => Ok(value.clone()),
        QueryState::Failed(err) => Err(err.clone()),
        QueryState::Pending => Err(QueryError::Abandoned),
    }
}
