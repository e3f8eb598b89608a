//! Verbatim request relay to a single backend.
//!
//! One forwarder is built per route from the route's backend authority; it
//! is stateless across requests. The inbound request is re-addressed to the
//! backend and otherwise passed through untouched: same method, same headers
//! (hop-by-hop ones included — the baseline contract does no filtering), and
//! the body as a stream. The backend's status, headers and body come back
//! byte-for-byte.
use std::{sync::Arc, time::Duration};

use axum::{
    body::Body as AxumBody,
    http::{StatusCode, Uri},
};
use hyper::{Request, Response};
use thiserror::Error;

use crate::ports::http_client::{HttpClient, HttpClientError};

/// Forwarding failures, each mapping to a fixed HTTP status and a short
/// machine-readable reason sent to the client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ForwardError {
    /// The outbound request could not be constructed (local failure).
    #[error("Failed to build upstream request: {0}")]
    Build(String),

    /// The backend could not be reached or the exchange did not complete.
    #[error("Upstream request failed: {0}")]
    Upstream(String),
}

impl ForwardError {
    /// HTTP status this failure terminates the request with.
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Build(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ForwardError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short machine-readable reason string for the response body.
    pub fn reason(&self) -> &'static str {
        match self {
            ForwardError::Build(_) => "upstream_build_failed",
            ForwardError::Upstream(_) => "upstream_unreachable",
        }
    }
}

impl From<HttpClientError> for ForwardError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::InvalidRequest(msg) => ForwardError::Build(msg),
            HttpClientError::ConnectionError(msg) => ForwardError::Upstream(msg),
            HttpClientError::Timeout(d) => {
                ForwardError::Upstream(format!("timed out after {d:?}"))
            }
        }
    }
}

/// Relays requests for one route to its backend and relays the response
/// back verbatim.
pub struct Forwarder {
    client: Arc<dyn HttpClient>,
    authority: String,
    timeout: Duration,
}

impl Forwarder {
    /// Build a forwarder dialing `authority` (`host:port`), bounding each
    /// backend exchange by `timeout`.
    pub fn new(client: Arc<dyn HttpClient>, authority: String, timeout: Duration) -> Self {
        Self {
            client,
            authority,
            timeout,
        }
    }

    /// The backend authority this forwarder dials.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Re-address `req` to the backend, preserving method, path, query,
    /// headers and the streaming body.
    fn build_upstream(&self, mut req: Request<AxumBody>) -> Result<Request<AxumBody>, ForwardError> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();

        let upstream_uri: Uri = format!("http://{}{}", self.authority, path_and_query)
            .parse()
            .map_err(|e| ForwardError::Build(format!("invalid upstream URI: {e}")))?;

        *req.uri_mut() = upstream_uri;
        Ok(req)
    }

    /// Execute the relay. On success the returned response carries the
    /// backend's status, every backend header and the backend body as a
    /// stream.
    ///
    /// A body-stream failure after the response head has been handed to the
    /// transport surfaces on the client connection; the status already sent
    /// cannot be rewritten at that point.
    pub async fn forward(
        &self,
        req: Request<AxumBody>,
    ) -> Result<Response<AxumBody>, ForwardError> {
        let upstream_req = self.build_upstream(req)?;

        tracing::debug!(
            backend = %self.authority,
            method = %upstream_req.method(),
            uri = %upstream_req.uri(),
            "forwarding request upstream"
        );

        let response = self.client.send_request(upstream_req, self.timeout).await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::header;
    use http_body_util::BodyExt;

    use super::*;
    use crate::ports::http_client::HttpClientResult;

    /// Client double that echoes the request it received as a 200 response,
    /// with the dialed URI in a header.
    struct EchoClient;

    #[async_trait]
    impl HttpClient for EchoClient {
        async fn send_request(
            &self,
            req: Request<AxumBody>,
            _timeout: Duration,
        ) -> HttpClientResult<Response<AxumBody>> {
            let uri = req.uri().to_string();
            let response = Response::builder()
                .status(StatusCode::OK)
                .header("x-dialed-uri", uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(req.into_body())
                .expect("response builds");
            Ok(response)
        }
    }

    /// Client double that refuses every exchange.
    struct RefusingClient;

    #[async_trait]
    impl HttpClient for RefusingClient {
        async fn send_request(
            &self,
            _req: Request<AxumBody>,
            _timeout: Duration,
        ) -> HttpClientResult<Response<AxumBody>> {
            Err(HttpClientError::ConnectionError(
                "connection refused".to_string(),
            ))
        }
    }

    fn forwarder(client: Arc<dyn HttpClient>) -> Forwarder {
        Forwarder::new(client, "svc-users:9000".to_string(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_upstream_uri_preserves_path_and_query() {
        let fwd = forwarder(Arc::new(EchoClient));
        let req = Request::builder()
            .method("GET")
            .uri("/users?id=1")
            .body(AxumBody::empty())
            .unwrap();

        let response = fwd.forward(req).await.unwrap();
        assert_eq!(
            response.headers().get("x-dialed-uri").unwrap(),
            "http://svc-users:9000/users?id=1"
        );
    }

    #[tokio::test]
    async fn test_body_relayed_byte_for_byte() {
        let fwd = forwarder(Arc::new(EchoClient));
        let req = Request::builder()
            .method("POST")
            .uri("/users")
            .body(AxumBody::from(r#"{"id":1}"#))
            .unwrap();

        let response = fwd.forward(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_unreachable_backend_maps_to_503() {
        let fwd = forwarder(Arc::new(RefusingClient));
        let req = Request::builder()
            .uri("/users")
            .body(AxumBody::empty())
            .unwrap();

        let err = fwd.forward(req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.reason(), "upstream_unreachable");
    }

    #[test]
    fn test_timeout_maps_to_upstream_error() {
        let err: ForwardError = HttpClientError::Timeout(Duration::from_secs(30)).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: ForwardError = HttpClientError::InvalidRequest("bad uri".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.reason(), "upstream_build_failed");
    }
}
