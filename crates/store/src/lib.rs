//! Candidate stores.
//!
//! Provides the `CandidateStore` trait with an in-memory snapshot store and a
//! PostgREST implementation. Scoring code only sees the trait, so the backing
//! database can change without touching the rankers.

pub mod memory;
pub mod postgrest;

use std::future::Future;

use intentmatch_model::Intent;
use intentmatch_query::{CandidatePredicate, QueryError};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgrest::{PostgrestConfig, PostgrestStore};

/// Errors from candidate store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Store not available")]
    Unavailable,

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Read-only source of candidate intents.
///
/// `find` returns an empty list, not an error, when nothing matches.
pub trait CandidateStore: Send + Sync {
    /// Fetch intents satisfying the predicate, in store order.
    fn find(
        &self,
        predicate: &CandidatePredicate,
    ) -> impl Future<Output = Result<Vec<Intent>, StoreError>> + Send;

    /// Check if the store is reachable.
    fn health_check(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Store name for logging.
    fn name(&self) -> &'static str;
}
