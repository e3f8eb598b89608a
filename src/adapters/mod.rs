pub mod http_client;
pub mod http_handler;
pub mod memory_store;
pub mod redis_store;

/// Re-export commonly used types from adapters
pub use http_client::HttpClientAdapter;
pub use http_handler::{HttpHandler, build_router};
pub use memory_store::InMemoryCounterStore;
pub use redis_store::RedisCounterStore;
