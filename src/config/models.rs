//! Configuration data structures for Gatehouse.
//!
//! These types map directly to YAML (also JSON / TOML) configuration files. They are
//! intentionally serde‑friendly and include defaults so that minimal configs remain concise.
//! Durations are expressed as humantime strings ("60s", "24h") and parsed once at startup.
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_token_ttl() -> String {
    "24h".to_string()
}

fn default_window() -> String {
    "60s".to_string()
}

fn default_store_timeout() -> String {
    "2s".to_string()
}

fn default_upstream_timeout() -> String {
    "30s".to_string()
}

/// A single path-to-backend mapping the pipeline is built from.
///
/// Immutable once the pipeline is constructed; paths are unique within a
/// route table (enforced by validation) and matched exactly, case-sensitive.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Route {
    /// Exact request path this route serves (e.g., "/users").
    pub path: String,
    /// Backend host name or IP.
    pub backend_host: String,
    /// Backend TCP port.
    pub backend_port: u16,
}

impl Route {
    /// The `host:port` authority the forwarder dials for this route.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.backend_host, self.backend_port)
    }
}

/// Signing configuration for bearer tokens.
///
/// The secret is shared between issuance and validation; rebuilding the
/// `TokenValidator` with a new secret replaces the key for all subsequent
/// calls.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC signing secret.
    pub secret: String,
    /// Lifetime of issued tokens, humantime format.
    #[serde(default = "default_token_ttl")]
    pub token_ttl: String,
}

impl AuthConfig {
    /// Parse the configured token lifetime.
    pub fn token_ttl(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.token_ttl)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl: default_token_ttl(),
        }
    }
}

/// Per-client quota parameters and the shared counter store address.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Counter store connection URL (e.g., "redis://127.0.0.1:6379").
    pub store_url: String,
    /// Maximum admitted requests per client per window.
    pub requests: u64,
    /// Window length, humantime format.
    #[serde(default = "default_window")]
    pub window: String,
    /// Bound on any single store round-trip.
    #[serde(default = "default_store_timeout")]
    pub store_timeout: String,
}

impl RateLimitConfig {
    /// Parse the configured window length.
    pub fn window(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.window)
    }

    /// Parse the configured store round-trip bound.
    pub fn store_timeout(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.store_timeout)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            store_url: "redis://127.0.0.1:6379".to_string(),
            requests: 100,
            window: default_window(),
            store_timeout: default_store_timeout(),
        }
    }
}

/// Settings for calls made to backends.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Bound on a complete backend exchange (connect through the response
    /// head), humantime format.
    pub timeout: String,
}

impl UpstreamConfig {
    /// Parse the configured upstream timeout.
    pub fn timeout(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.timeout)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: default_upstream_timeout(),
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    /// The address the gateway listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Token signing/verification settings.
    pub auth: AuthConfig,
    /// Quota parameters and counter store address.
    pub rate_limit: RateLimitConfig,
    /// Backend call settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Ordered route table; one composed handler per entry.
    pub routes: Vec<Route>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            upstream: UpstreamConfig::default(),
            routes: Vec::new(),
        }
    }
}
