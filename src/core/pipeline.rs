//! Request pipeline composition.
//!
//! Each route gets one composed handler, built in fixed order:
//! `RequestLogger(AuthGuard(RateLimitGuard(ForwardStage)))`. Stages are
//! `Handler` values threaded into each other by explicit builder code; a
//! stage either delegates to the next handler or terminates the request with
//! a status and a short machine-readable reason. No request re-enters the
//! pipeline and every written response is terminal.
use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    body::Body as AxumBody,
    extract::ConnectInfo,
    http::StatusCode,
    response::IntoResponse,
};
use hyper::{Request, Response};

use crate::{
    config::Route,
    core::{
        auth::{AuthSubject, TokenValidator},
        forwarder::Forwarder,
        logger::RequestLogger,
        rate_limiter::{RateLimitError, RateLimiter},
    },
    metrics,
    ports::http_client::HttpClient,
};

/// A single request-handling capability: one operation, request in,
/// response out. Composition happens by wrapping one handler in another.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, req: Request<AxumBody>) -> Response<AxumBody>;
}

/// Terminal rejection response: status plus a short machine-readable reason.
pub(crate) fn reject(status: StatusCode, reason: &'static str) -> Response<AxumBody> {
    (status, reason).into_response()
}

/// Pipeline stage enforcing bearer-token authentication.
///
/// On success the token's subject is attached to the request extensions for
/// downstream use; on any auth failure the request terminates here.
pub struct AuthGuard {
    validator: Arc<TokenValidator>,
    next: Arc<dyn Handler>,
}

impl AuthGuard {
    pub fn new(validator: Arc<TokenValidator>, next: Arc<dyn Handler>) -> Self {
        Self { validator, next }
    }
}

#[async_trait]
impl Handler for AuthGuard {
    async fn handle(&self, mut req: Request<AxumBody>) -> Response<AxumBody> {
        match self.validator.authorize(req.headers()) {
            Ok(claims) => {
                req.extensions_mut().insert(AuthSubject(claims.sub));
                self.next.handle(req).await
            }
            Err(e) => {
                tracing::warn!(reason = e.reason(), "request rejected by auth");
                metrics::increment_auth_failures(e.reason());
                reject(e.status(), e.reason())
            }
        }
    }
}

/// Pipeline stage enforcing the per-client quota.
///
/// The client key is the peer IP taken from `ConnectInfo` in the request
/// extensions. A request with no observable peer address is rejected — the
/// limiter never admits what it cannot attribute.
pub struct RateLimitGuard {
    limiter: RateLimiter,
    next: Arc<dyn Handler>,
}

impl RateLimitGuard {
    pub fn new(limiter: RateLimiter, next: Arc<dyn Handler>) -> Self {
        Self { limiter, next }
    }
}

#[async_trait]
impl Handler for RateLimitGuard {
    async fn handle(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let client_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| connect_info.0.ip());

        let Some(client_ip) = client_ip else {
            tracing::error!("no client address on request; rejecting");
            return reject(StatusCode::INTERNAL_SERVER_ERROR, "client_addr_unavailable");
        };

        match self.limiter.check(&client_ip.to_string()).await {
            Ok(()) => self.next.handle(req).await,
            Err(e) => {
                if matches!(e, RateLimitError::Exceeded { .. }) {
                    metrics::increment_rate_limited(&client_ip.to_string());
                } else {
                    tracing::error!(error = %e, "counter store failure, failing closed");
                }
                reject(e.status(), e.reason())
            }
        }
    }
}

/// Leaf pipeline stage: relays the request to the route's backend.
pub struct ForwardStage {
    forwarder: Forwarder,
}

impl ForwardStage {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl Handler for ForwardStage {
    async fn handle(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let _timer = metrics::UpstreamRequestTimer::new(self.forwarder.authority(), &path);

        match self.forwarder.forward(req).await {
            Ok(response) => {
                metrics::increment_upstream_request_total(
                    self.forwarder.authority(),
                    &path,
                    &method,
                    response.status().as_u16(),
                );
                response
            }
            Err(e) => {
                tracing::error!(
                    backend = %self.forwarder.authority(),
                    error = %e,
                    "upstream relay failed"
                );
                let status = e.status();
                metrics::increment_upstream_request_total(
                    self.forwarder.authority(),
                    &path,
                    &method,
                    status.as_u16(),
                );
                reject(status, e.reason())
            }
        }
    }
}

/// Builds the handler-per-route map the HTTP dispatcher serves from.
pub struct Pipeline;

impl Pipeline {
    /// Compose one handler per route in fixed stage order. The map is
    /// immutable after this call; route matching against it is exact-path
    /// and case-sensitive.
    pub fn build(
        routes: &[Route],
        validator: Arc<TokenValidator>,
        limiter: RateLimiter,
        client: Arc<dyn HttpClient>,
        upstream_timeout: Duration,
    ) -> HashMap<String, Arc<dyn Handler>> {
        let mut handlers: HashMap<String, Arc<dyn Handler>> = HashMap::new();

        for route in routes {
            let forwarder = Forwarder::new(client.clone(), route.authority(), upstream_timeout);
            let forward: Arc<dyn Handler> = Arc::new(ForwardStage::new(forwarder));
            let rate_limited: Arc<dyn Handler> =
                Arc::new(RateLimitGuard::new(limiter.clone(), forward));
            let authed: Arc<dyn Handler> = Arc::new(AuthGuard::new(validator.clone(), rate_limited));
            let logged: Arc<dyn Handler> = Arc::new(RequestLogger::new(authed));

            handlers.insert(route.path.clone(), logged);
        }

        handlers
    }
}
