//! Gatehouse - an authenticating, rate-limiting API gateway.
//!
//! Gatehouse sits in front of a set of backend services and runs every
//! inbound request through a fixed pipeline — request logging, bearer-token
//! authentication, per-client rate limiting against a shared counter store,
//! and verbatim relay to the route's backend. This library exposes the
//! building blocks so you can embed the gateway or compose parts of it
//! inside your own application.
//!
//! # Features
//! - Exact-path routing to per-route backends (GET/POST/PUT/DELETE)
//! - HMAC-signed bearer tokens (issuance and validation share one secret)
//! - Per-client quotas backed by an atomic create-or-increment counter
//!   store (Redis adapter included, in-memory adapter for tests)
//! - Byte-for-byte response relay: status, headers and body pass through
//!   unchanged
//! - Bounded timeouts on upstream and store calls
//! - Structured tracing, request metrics & graceful shutdown
//!
//! # Quick Example
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use gatehouse::{
//!     adapters::{HttpClientAdapter, InMemoryCounterStore},
//!     config::GatewayConfig,
//!     core::{Pipeline, RateLimiter, TokenValidator},
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let cfg: GatewayConfig = gatehouse::config::loader::load_config("gatehouse.yaml").await?;
//! let validator = Arc::new(TokenValidator::new(&cfg.auth));
//! let limiter = RateLimiter::new(
//!     Arc::new(InMemoryCounterStore::new()),
//!     cfg.rate_limit.requests,
//!     cfg.rate_limit.window()?,
//! );
//! let handlers = Pipeline::build(
//!     &cfg.routes,
//!     validator,
//!     limiter,
//!     Arc::new(HttpClientAdapter::new()),
//!     cfg.upstream.timeout()?,
//! );
//! // You would normally wire this into the provided HttpHandler adapter (see binary crate)
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping business logic inside `core`. End users should prefer the
//! re‑exports documented below instead of reaching into internal modules
//! directly.
//!
//! # Error Handling
//! Pipeline stages use domain error types (`AuthError`, `RateLimitError`,
//! `StoreError`, `ForwardError`), each carrying its terminal HTTP status and
//! a short machine-readable reason. Startup and CLI paths return
//! `eyre::Result<T>` with context attached via `WrapErr`.
//!
//! # Concurrency
//! Each request runs on its own task. Components are constructed once at
//! startup and shared read-only behind `Arc`; the only cross-request
//! coordination point is the external counter store, whose
//! create-or-increment primitive is atomic on the store side. A client
//! disconnect drops the request's task, cancelling any in-flight upstream
//! call without touching other requests' counters or logs.
//!
//! # License
//! Licensed under Apache-2.0.
// Re-export public modules with explicit visibility controls
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{HttpClientAdapter, HttpHandler, InMemoryCounterStore, RedisCounterStore},
    core::{Pipeline, RateLimiter, TokenValidator},
    ports::{counter_store::CounterStore, http_client::HttpClient},
    utils::GracefulShutdown,
};
