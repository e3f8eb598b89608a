use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use http::{Request, Response};
use thiserror::Error;

/// Custom error type for HTTP client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to backend fails
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when request times out
    #[error("Timeout error after {0:?}")]
    Timeout(Duration),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for making HTTP requests to backends
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send an HTTP request to a backend server, bounded by `timeout`.
    ///
    /// The timeout covers connection establishment through receipt of the
    /// response head; the response body is streamed to the caller and is not
    /// covered.
    ///
    /// # Arguments
    /// * `req` - The HTTP request to send to the backend
    /// * `timeout` - Upper bound on the exchange
    ///
    /// # Returns
    /// A future that resolves to the backend's response or an error
    async fn send_request(
        &self,
        req: Request<AxumBody>,
        timeout: Duration,
    ) -> HttpClientResult<Response<AxumBody>>;
}
