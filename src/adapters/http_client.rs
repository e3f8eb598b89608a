use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response, Version, header::HeaderValue};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tokio::time::timeout;

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult};

/// HTTP client adapter using Hyper's pooled legacy client (HTTP/1.1).
///
/// Responsibilities:
/// * Rewrites the Host header to the dialed authority (the inbound Host
///   names the gateway, not the backend)
/// * Bounds each exchange with the caller-supplied timeout
/// * Converts between Hyper body and Axum body types
///
/// Everything else passes through verbatim — no default headers are
/// injected and no response headers are touched; hyper itself owns message
/// framing on both legs of the relay.
pub struct HttpClientAdapter {
    client: Client<HttpConnector, AxumBody>,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter.
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http::<AxumBody>();
        tracing::info!("Created upstream HTTP client (HTTP/1.1, pooled connections)");
        Self { client }
    }
}

impl Default for HttpClientAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
        exchange_timeout: Duration,
    ) -> HttpClientResult<Response<AxumBody>> {
        let client = self.client.clone();

        // Point the Host header at the backend authority
        let Some(host_str) = req.uri().host() else {
            tracing::error!("Outgoing URI has no host: {}", req.uri());
            return Err(HttpClientError::InvalidRequest(
                "Outgoing URI has no host".to_string(),
            ));
        };
        let host_header_val = if let Some(port) = req.uri().port() {
            HeaderValue::from_str(&format!("{host_str}:{}", port.as_u16()))
        } else {
            HeaderValue::from_str(host_str)
        }
        .map_err(|e| HttpClientError::InvalidRequest(format!("invalid host header: {e}")))?;
        req.headers_mut().insert(hyper::header::HOST, host_header_val);

        let (mut parts, axum_body) = req.into_parts();
        parts.version = Version::HTTP_11;

        let method_for_error_log = parts.method.clone();
        let uri_for_error_log = parts.uri.clone();

        tracing::debug!("Sending upstream request: {} {}", parts.method, parts.uri);

        // Use the streaming body directly
        let outgoing_request = Request::from_parts(parts, axum_body);

        match timeout(exchange_timeout, client.request(outgoing_request)).await {
            Ok(Ok(response)) => {
                let (parts, hyper_body) = response.into_parts();
                let axum_body = AxumBody::new(hyper_body);
                Ok(Response::from_parts(parts, axum_body))
            }
            Ok(Err(e)) => {
                tracing::error!(
                    "Error making request to backend ({} {}): {}",
                    method_for_error_log,
                    uri_for_error_log,
                    e
                );
                Err(HttpClientError::ConnectionError(format!(
                    "Request to {method_for_error_log} {uri_for_error_log} failed: {e}"
                )))
            }
            Err(_) => {
                tracing::error!(
                    "Upstream request timed out after {:?}: {} {}",
                    exchange_timeout,
                    method_for_error_log,
                    uri_for_error_log
                );
                Err(HttpClientError::Timeout(exchange_timeout))
            }
        }
    }
}
