//! Exact-path dispatch over the composed pipeline.
//!
//! The dispatcher owns the immutable handler-per-route map the pipeline
//! produced and routes each inbound request to its composed handler by
//! exact, case-sensitive path match. Method restriction (GET/POST/PUT/
//! DELETE) is the transport layer's job and is applied where the axum
//! routes are registered, not here.
use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    body::Body as AxumBody,
    extract::{ConnectInfo, Request as AxumRequest},
    http::StatusCode,
    routing::{MethodFilter, on},
};
use hyper::{Request, Response};

use crate::core::pipeline::{Handler, reject};

/// HTTP dispatcher for the Gatehouse pipeline.
pub struct HttpHandler {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HttpHandler {
    pub fn new(handlers: HashMap<String, Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }

    /// The route paths this dispatcher serves.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Dispatch a request to its route's composed handler.
    ///
    /// When `client_addr` is given it is attached to the request extensions
    /// so the rate-limit stage can key its counter; a request arriving with
    /// the extension already present (e.g. from axum's connect-info
    /// make-service) needs no address here.
    pub async fn handle_request(
        &self,
        mut req: Request<AxumBody>,
        client_addr: Option<SocketAddr>,
    ) -> Response<AxumBody> {
        if let Some(addr) = client_addr {
            req.extensions_mut().insert(ConnectInfo(addr));
        }

        match self.handlers.get(req.uri().path()) {
            Some(handler) => handler.handle(req).await,
            None => {
                tracing::debug!("No route configured for path {}", req.uri().path());
                reject(StatusCode::NOT_FOUND, "route_not_found")
            }
        }
    }
}

/// Register each configured route on an axum `Router`, restricted to
/// GET/POST/PUT/DELETE. Other methods are rejected here by the transport
/// with 405 before the pipeline is entered.
pub fn build_router(handler: Arc<HttpHandler>) -> axum::Router {
    let methods = MethodFilter::GET
        .or(MethodFilter::POST)
        .or(MethodFilter::PUT)
        .or(MethodFilter::DELETE);

    let mut router = axum::Router::new();
    for path in handler.paths().map(str::to_string).collect::<Vec<_>>() {
        let handler = handler.clone();
        router = router.route(
            &path,
            on(methods, move |req: AxumRequest| {
                let handler = handler.clone();
                async move { handler.handle_request(req, None).await }
            }),
        );
    }
    router
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::http::header;
    use tower::ServiceExt; // for oneshot

    use super::*;
    use crate::{
        adapters::memory_store::InMemoryCounterStore,
        config::{AuthConfig, Route},
        core::{Pipeline, RateLimiter, TokenValidator},
        ports::http_client::{HttpClient, HttpClientResult},
    };

    struct OkClient;

    #[async_trait]
    impl HttpClient for OkClient {
        async fn send_request(
            &self,
            _req: Request<AxumBody>,
            _timeout: Duration,
        ) -> HttpClientResult<Response<AxumBody>> {
            Ok(Response::builder()
                .status(StatusCode::OK)
                .body(AxumBody::from("ok"))
                .expect("response builds"))
        }
    }

    fn dispatcher() -> (Arc<HttpHandler>, Arc<TokenValidator>) {
        let validator = Arc::new(TokenValidator::new(&AuthConfig {
            secret: "dispatch-test-secret".to_string(),
            ..AuthConfig::default()
        }));
        let limiter = RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            100,
            Duration::from_secs(60),
        );
        let routes = vec![Route {
            path: "/users".to_string(),
            backend_host: "svc-users".to_string(),
            backend_port: 9000,
        }];
        let handlers = Pipeline::build(
            &routes,
            validator.clone(),
            limiter,
            Arc::new(OkClient),
            Duration::from_secs(5),
        );
        (Arc::new(HttpHandler::new(handlers)), validator)
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (dispatcher, _) = dispatcher();
        let req = Request::builder()
            .uri("/nope")
            .body(AxumBody::empty())
            .unwrap();

        let addr: SocketAddr = "10.0.0.1:55001".parse().unwrap();
        let response = dispatcher.handle_request(req, Some(addr)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_path_match_is_case_sensitive() {
        let (dispatcher, validator) = dispatcher();
        let token = validator.generate("alice").unwrap();
        let req = Request::builder()
            .uri("/Users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(AxumBody::empty())
            .unwrap();

        let addr: SocketAddr = "10.0.0.1:55001".parse().unwrap();
        let response = dispatcher.handle_request(req, Some(addr)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_router_rejects_unlisted_methods() {
        let (dispatcher, validator) = dispatcher();
        let router = build_router(dispatcher);
        let token = validator.generate("alice").unwrap();

        let mut req = Request::builder()
            .method("PATCH")
            .uri("/users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(AxumBody::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.0.0.1:55001".parse::<SocketAddr>().unwrap()));

        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_router_serves_configured_route() {
        let (dispatcher, validator) = dispatcher();
        let router = build_router(dispatcher);
        let token = validator.generate("alice").unwrap();

        let mut req = Request::builder()
            .method("GET")
            .uri("/users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(AxumBody::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.0.0.1:55001".parse::<SocketAddr>().unwrap()));

        let response = router.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
