//! Lightweight metrics helpers for Gatehouse.
//!
//! This module exposes a small set of convenience functions and RAII timers
//! wrapping the `metrics` crate macros. It intentionally avoids embedding a
//! concrete exporter (the application can initialize any compatible recorder
//! externally) while still documenting and describing Gatehouse‑specific
//! metric names.
//!
//! Provided metrics (labels vary by family):
//! * `gatehouse_requests_total` (counter)
//! * `gatehouse_request_duration_seconds` (histogram)
//! * `gatehouse_upstream_requests_total` (counter)
//! * `gatehouse_upstream_request_duration_seconds` (histogram)
//! * `gatehouse_auth_failures_total` (counter)
//! * `gatehouse_rate_limited_total` (counter)
//!
//! The timer struct leverages `Drop` to record durations safely even when
//! early returns or errors occur.
use std::time::Instant;

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::Lazy;

// Gatehouse-specific metric names
pub const GATEHOUSE_REQUESTS_TOTAL: &str = "gatehouse_requests_total";
pub const GATEHOUSE_REQUEST_DURATION_SECONDS: &str = "gatehouse_request_duration_seconds";
pub const GATEHOUSE_UPSTREAM_REQUESTS_TOTAL: &str = "gatehouse_upstream_requests_total";
pub const GATEHOUSE_UPSTREAM_REQUEST_DURATION_SECONDS: &str =
    "gatehouse_upstream_request_duration_seconds";
pub const GATEHOUSE_AUTH_FAILURES_TOTAL: &str = "gatehouse_auth_failures_total";
pub const GATEHOUSE_RATE_LIMITED_TOTAL: &str = "gatehouse_rate_limited_total";

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        GATEHOUSE_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of HTTP requests processed by the gateway."
    );
    describe_histogram!(
        GATEHOUSE_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of HTTP requests processed by the gateway."
    );
    describe_counter!(
        GATEHOUSE_UPSTREAM_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of HTTP requests relayed to backend services."
    );
    describe_histogram!(
        GATEHOUSE_UPSTREAM_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of HTTP requests relayed to backend services."
    );
    describe_counter!(
        GATEHOUSE_AUTH_FAILURES_TOTAL,
        Unit::Count,
        "Requests terminated by the authentication stage (by reason)."
    );
    describe_counter!(
        GATEHOUSE_RATE_LIMITED_TOTAL,
        Unit::Count,
        "Requests rejected by the rate-limit stage."
    );
});

/// Increment the total request counter for an inbound gateway request.
pub fn increment_request_total(path: &str, method: &str, status: u16) {
    counter!(
        GATEHOUSE_REQUESTS_TOTAL,
        "path" => path.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a completed inbound request's duration.
pub fn record_request_duration(path: &str, method: &str, duration: std::time::Duration) {
    histogram!(
        GATEHOUSE_REQUEST_DURATION_SECONDS,
        "path" => path.to_string(),
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Increment total count of relayed upstream requests.
pub fn increment_upstream_request_total(backend: &str, path: &str, method: &str, status: u16) {
    counter!(
        GATEHOUSE_UPSTREAM_REQUESTS_TOTAL,
        "backend" => backend.to_string(),
        "path" => path.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Increment the auth-failure counter for a terminated request.
pub fn increment_auth_failures(reason: &str) {
    counter!(
        GATEHOUSE_AUTH_FAILURES_TOTAL,
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Increment the rate-limited counter for a rejected request.
pub fn increment_rate_limited(client: &str) {
    counter!(
        GATEHOUSE_RATE_LIMITED_TOTAL,
        "client" => client.to_string()
    )
    .increment(1);
}

/// Record a completed upstream exchange's duration.
pub fn record_upstream_request_duration(
    backend: &str,
    path: &str,
    duration: std::time::Duration,
) {
    histogram!(
        GATEHOUSE_UPSTREAM_REQUEST_DURATION_SECONDS,
        "backend" => backend.to_string(),
        "path" => path.to_string()
    )
    .record(duration.as_secs_f64());
}

/// RAII helper measuring upstream exchange duration.
pub struct UpstreamRequestTimer {
    start: Instant,
    backend: String,
    path: String,
}

impl UpstreamRequestTimer {
    pub fn new(backend: &str, path: &str) -> Self {
        Self {
            start: Instant::now(),
            backend: backend.to_string(),
            path: path.to_string(),
        }
    }
}

impl Drop for UpstreamRequestTimer {
    fn drop(&mut self) {
        record_upstream_request_duration(&self.backend, &self.path, self.start.elapsed());
    }
}

/// Initialize metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    tracing::info!("Initializing Gatehouse metrics system");

    // Force lazy initialization of metric descriptions
    Lazy::force(&DESCRIPTIONS);

    tracing::info!("Gatehouse metrics system initialized successfully");
    Ok(())
}
