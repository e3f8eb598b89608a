// End-to-end pipeline tests against a live backend spawned in-process.
#[cfg(test)]
mod test {
    use std::{
        net::SocketAddr,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
        routing::{get, post},
    };
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use gatehouse::{
        adapters::{HttpClientAdapter, HttpHandler, InMemoryCounterStore},
        config::{AuthConfig, Route},
        core::{Pipeline, RateLimiter, TokenValidator},
    };

    /// Spawn a small backend on an ephemeral port. Counts the requests it
    /// serves so tests can assert the forwarder was (not) invoked.
    async fn spawn_backend() -> (SocketAddr, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));

        let users_hits = hits.clone();
        let echo_hits = hits.clone();
        let app = Router::new()
            .route(
                "/users",
                get(move |req: Request<Body>| {
                    let hits = users_hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        let query = req.uri().query().unwrap_or("").to_string();
                        Response::builder()
                            .status(StatusCode::OK)
                            .header(header::CONTENT_TYPE, "application/json")
                            .header("x-backend-tag", "users-v1")
                            .header("x-echo-query", query)
                            .body(Body::from(r#"{"id":1}"#))
                            .unwrap()
                    }
                }),
            )
            .route(
                "/echo",
                post(move |body: Bytes| {
                    let hits = echo_hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        Response::builder()
                            .status(StatusCode::CREATED)
                            .header("x-backend-tag", "echo-v1")
                            .body(Body::from(body))
                            .unwrap()
                    }
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (addr, hits)
    }

    fn build_gateway(
        backend: SocketAddr,
        limit: u64,
    ) -> (Arc<HttpHandler>, Arc<TokenValidator>) {
        let routes = vec![
            Route {
                path: "/users".to_string(),
                backend_host: backend.ip().to_string(),
                backend_port: backend.port(),
            },
            Route {
                path: "/echo".to_string(),
                backend_host: backend.ip().to_string(),
                backend_port: backend.port(),
            },
        ];

        let validator = Arc::new(TokenValidator::new(&AuthConfig {
            secret: "integration-test-secret".to_string(),
            ..AuthConfig::default()
        }));
        let limiter = RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            limit,
            Duration::from_secs(60),
        );
        let handlers = Pipeline::build(
            &routes,
            validator.clone(),
            limiter,
            Arc::new(HttpClientAdapter::new()),
            Duration::from_secs(5),
        );

        (Arc::new(HttpHandler::new(handlers)), validator)
    }

    fn client_addr(ip: &str) -> SocketAddr {
        format!("{ip}:55001").parse().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_relay_is_byte_identical() {
        let (backend, _) = spawn_backend().await;
        let (gateway, validator) = build_gateway(backend, 100);
        let token = validator.generate("alice").unwrap();

        let req = Request::builder()
            .method("GET")
            .uri("/users?id=1")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = gateway
            .handle_request(req, Some(client_addr("10.0.0.1")))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.headers().get("x-backend-tag").unwrap(), "users-v1");
        // Query string reached the backend untouched
        assert_eq!(response.headers().get("x-echo-query").unwrap(), "id=1");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"id":1}"#);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_request_body_reaches_backend_unchanged() {
        let (backend, _) = spawn_backend().await;
        let (gateway, validator) = build_gateway(backend, 100);
        let token = validator.generate("alice").unwrap();

        let payload = br#"{"name":"new-user","tags":["a","b"]}"#;
        let req = Request::builder()
            .method("POST")
            .uri("/echo")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(&payload[..]))
            .unwrap();

        let response = gateway
            .handle_request(req, Some(client_addr("10.0.0.1")))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], payload);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_token_never_hits_backend() {
        let (backend, hits) = spawn_backend().await;
        let (gateway, _) = build_gateway(backend, 100);

        let req = Request::builder()
            .method("GET")
            .uri("/users")
            .body(Body::empty())
            .unwrap();

        let response = gateway
            .handle_request(req, Some(client_addr("10.0.0.1")))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"missing_token");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_quota_exhaustion_yields_429() {
        let (backend, hits) = spawn_backend().await;
        let (gateway, validator) = build_gateway(backend, 2);
        let token = validator.generate("alice").unwrap();

        for _ in 0..2 {
            let req = Request::builder()
                .method("GET")
                .uri("/users")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap();
            let response = gateway
                .handle_request(req, Some(client_addr("10.0.0.1")))
                .await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        let req = Request::builder()
            .method("GET")
            .uri("/users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = gateway
            .handle_request(req, Some(client_addr("10.0.0.1")))
            .await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        // A different client is still admitted
        let req = Request::builder()
            .method("GET")
            .uri("/users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = gateway
            .handle_request(req, Some(client_addr("10.0.0.2")))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refused_backend_yields_503() {
        // Bind a listener to reserve a port, then drop it so connections
        // to that port are refused.
        let refused_addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let (gateway, validator) = build_gateway(refused_addr, 100);
        let token = validator.generate("alice").unwrap();

        let req = Request::builder()
            .method("GET")
            .uri("/users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = gateway
            .handle_request(req, Some(client_addr("10.0.0.1")))
            .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"upstream_unreachable");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tampered_token_is_rejected() {
        let (backend, hits) = spawn_backend().await;
        let (gateway, _) = build_gateway(backend, 100);

        let foreign = TokenValidator::new(&AuthConfig {
            secret: "some-other-secret".to_string(),
            ..AuthConfig::default()
        });
        let token = foreign.generate("alice").unwrap();

        let req = Request::builder()
            .method("GET")
            .uri("/users")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = gateway
            .handle_request(req, Some(client_addr("10.0.0.1")))
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"invalid_signature");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
