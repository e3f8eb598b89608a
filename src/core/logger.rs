//! Request logging stage.
//!
//! Outermost pipeline stage: records method and path on entry, delegates,
//! then emits one completion record with the final status and elapsed
//! wall-clock time. The response itself passes through untouched. A status
//! the downstream chain never set explicitly surfaces as the response's
//! default (200).
use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use uuid::Uuid;

use crate::{core::pipeline::Handler, metrics};

/// Wraps a handler to record start/end and outcome of every request.
pub struct RequestLogger {
    next: Arc<dyn Handler>,
}

impl RequestLogger {
    pub fn new(next: Arc<dyn Handler>) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Handler for RequestLogger {
    async fn handle(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let request_id = Uuid::new_v4();

        tracing::info!(request_id = %request_id, "Started {} {}", method, path);

        let response = self.next.handle(req).await;

        let duration = start.elapsed();
        let status = response.status();

        tracing::info!(
            request_id = %request_id,
            "Completed {} {} {} in {:?}",
            method,
            path,
            status.as_u16(),
            duration
        );

        metrics::increment_request_total(&path, method.as_str(), status.as_u16());
        metrics::record_request_duration(&path, method.as_str(), duration);

        response
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    use super::*;

    /// Handler double returning a canned response.
    struct Canned(StatusCode);

    #[async_trait]
    impl Handler for Canned {
        async fn handle(&self, _req: Request<AxumBody>) -> Response<AxumBody> {
            Response::builder()
                .status(self.0)
                .header("x-backend", "canned")
                .body(AxumBody::from("payload"))
                .expect("response builds")
        }
    }

    #[tokio::test]
    async fn test_response_passes_through_untouched() {
        let logger = RequestLogger::new(Arc::new(Canned(StatusCode::CREATED)));
        let req = Request::builder()
            .method("POST")
            .uri("/users")
            .body(AxumBody::empty())
            .unwrap();

        let response = logger.handle(req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-backend").unwrap(), "canned");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"payload");
    }

    #[tokio::test]
    async fn test_default_status_observed_as_200() {
        struct Bare;

        #[async_trait]
        impl Handler for Bare {
            async fn handle(&self, _req: Request<AxumBody>) -> Response<AxumBody> {
                // Builder without an explicit status
                Response::builder().body(AxumBody::empty()).unwrap()
            }
        }

        let logger = RequestLogger::new(Arc::new(Bare));
        let req = Request::builder()
            .uri("/users")
            .body(AxumBody::empty())
            .unwrap();

        let response = logger.handle(req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
