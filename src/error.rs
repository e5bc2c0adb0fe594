//! Error types for the query cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use thiserror::Error;

// == Query Error Enum ==
/// Unified error type surfaced by cache operations.
///
/// Cloneable so that a single computation failure can be handed to every
/// concurrent waiter and to every later caller that finds the failed entry.
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    /// The underlying computation failed. The entry stays in the table and
    /// re-surfaces this same failure until the key is invalidated.
    #[error("query computation failed: {0}")]
    Computation(Arc<anyhow::Error>),

    /// The computation went away without ever settling (e.g. its task was
    /// torn down with the runtime).
    #[error("query computation was abandoned before settling")]
    Abandoned,
}

impl QueryError {
    /// Wraps a computation failure for shared re-surfacing.
    pub fn computation(err: anyhow::Error) -> Self {
        QueryError::Computation(Arc::new(err))
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, QueryError>;
