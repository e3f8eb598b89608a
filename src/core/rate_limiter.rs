//! Per-client request quota enforcement over a shared counter store.
//!
//! Each client (keyed by peer IP) owns one counter in the store, created at 1
//! with a TTL of one window on its first request and incremented on each
//! request after that. Admission is decided from the post-increment count in
//! a single atomic store round-trip — the store, not this process, is the
//! coordination point between concurrent requests from the same client.
use std::{sync::Arc, time::Duration};

use axum::http::StatusCode;
use thiserror::Error;

use crate::ports::counter_store::{CounterStore, StoreError};

/// Rate limiting failures, each mapping to a fixed HTTP status and a short
/// machine-readable reason sent to the client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RateLimitError {
    /// The client exhausted its quota for the current window.
    #[error("Rate limit exceeded: {count} requests in the current window (limit {limit})")]
    Exceeded { count: u64, limit: u64 },

    /// The counter store could not be consulted. The request is rejected —
    /// the limiter fails closed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RateLimitError {
    /// HTTP status this failure terminates the request with.
    pub fn status(&self) -> StatusCode {
        match self {
            RateLimitError::Exceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            RateLimitError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable reason string for the response body.
    pub fn reason(&self) -> &'static str {
        match self {
            RateLimitError::Exceeded { .. } => "rate_limit_exceeded",
            RateLimitError::Store(_) => "store_unavailable",
        }
    }
}

/// Decides admit/reject per client against the shared counter store.
///
/// Cheap to clone; the store handle is shared.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    limit: u64,
    window: Duration,
}

impl RateLimiter {
    /// Build a limiter over `store` admitting at most `limit` requests per
    /// client per `window`.
    pub fn new(store: Arc<dyn CounterStore>, limit: u64, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
        }
    }

    /// Check whether the request identified by `client_key` is admitted.
    ///
    /// One atomic create-or-increment against the store; a fresh counter
    /// (count 1) always admits, an existing one admits while its
    /// pre-increment value was below the limit.
    pub async fn check(&self, client_key: &str) -> Result<(), RateLimitError> {
        let count = self
            .store
            .create_or_increment(client_key, self.window)
            .await?;

        if count > self.limit {
            tracing::debug!(
                client = client_key,
                count,
                limit = self.limit,
                "rate limit exceeded"
            );
            return Err(RateLimitError::Exceeded {
                count,
                limit: self.limit,
            });
        }

        Ok(())
    }

    /// The configured per-window limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The configured window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}
