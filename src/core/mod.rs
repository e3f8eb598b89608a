pub mod auth;
pub mod forwarder;
pub mod logger;
pub mod pipeline;
pub mod rate_limiter;

pub use auth::TokenValidator;
pub use forwarder::Forwarder;
pub use logger::RequestLogger;
pub use pipeline::{Handler, Pipeline};
pub use rate_limiter::RateLimiter;
