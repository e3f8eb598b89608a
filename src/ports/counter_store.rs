use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Custom error type for counter store operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not be reached or the operation did not complete.
    /// The rate limiter treats this as terminal and fails closed.
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for counter store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// CounterStore defines the port (interface) for the shared per-client
/// request counters backing the rate limiter.
///
/// Counters are keyed by client identifier, start at 1 and expire when their
/// window elapses; the next request after expiry re-creates the counter at 1.
/// Every operation here must be atomic on the store side — the gateway runs
/// many requests concurrently and takes no in-process locks around these
/// calls.
#[async_trait]
pub trait CounterStore: Send + Sync + 'static {
    /// Create the counter for `key` at 1 with the given TTL, succeeding only
    /// if no counter currently exists. Returns true when created.
    async fn create_if_absent(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    /// Increment an existing counter and return the new count.
    async fn increment_and_get(&self, key: &str) -> StoreResult<u64>;

    /// Single round-trip create-or-increment: increments the counter for
    /// `key`, creating it at 1 with the given TTL when absent, and returns
    /// the post-increment count.
    ///
    /// Implementations must perform this as one atomic store operation
    /// (e.g., a scripted transaction). Composing [`create_if_absent`] and
    /// [`increment_and_get`] from the caller's side would reintroduce the
    /// read-then-write race between concurrent requests from the same
    /// client.
    ///
    /// [`create_if_absent`]: CounterStore::create_if_absent
    /// [`increment_and_get`]: CounterStore::increment_and_get
    async fn create_or_increment(&self, key: &str, ttl: Duration) -> StoreResult<u64>;

    /// Current count for `key`, or None when no counter exists (never
    /// created, or the window elapsed).
    async fn get(&self, key: &str) -> StoreResult<Option<u64>>;
}
