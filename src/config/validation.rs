use std::{collections::HashSet, net::SocketAddr};

use eyre::Result;

use crate::config::models::{GatewayConfig, Route};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Route conflict detected: {message}")]
    RouteConflict { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Gateway configuration validator
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the entire gateway configuration
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if config.auth.secret.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "auth.secret".to_string(),
            });
        }
        if let Err(e) = config.auth.token_ttl() {
            errors.push(ValidationError::InvalidField {
                field: "auth.token_ttl".to_string(),
                message: e.to_string(),
            });
        }

        if config.rate_limit.requests == 0 {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.requests".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if let Err(e) = config.rate_limit.window() {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.window".to_string(),
                message: e.to_string(),
            });
        }
        if let Err(e) = config.rate_limit.store_timeout() {
            errors.push(ValidationError::InvalidField {
                field: "rate_limit.store_timeout".to_string(),
                message: e.to_string(),
            });
        }
        if let Err(e) = config.upstream.timeout() {
            errors.push(ValidationError::InvalidField {
                field: "upstream.timeout".to_string(),
                message: e.to_string(),
            });
        }

        if config.routes.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "routes".to_string(),
            });
        } else {
            for route in &config.routes {
                if let Err(mut route_errors) = Self::validate_single_route(route) {
                    errors.append(&mut route_errors);
                }
            }
            if let Err(conflicts) = Self::check_duplicate_paths(&config.routes) {
                errors.extend(conflicts);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Validate a single route entry
    fn validate_single_route(route: &Route) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !route.path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("route path: {}", route.path),
                message: "Route paths must start with '/'".to_string(),
            });
        }
        if route.backend_host.is_empty() {
            errors.push(ValidationError::MissingField {
                field: format!("route '{}' backend_host", route.path),
            });
        }
        if route.backend_port == 0 {
            errors.push(ValidationError::InvalidField {
                field: format!("route '{}' backend_port", route.path),
                message: "must be a non-zero port".to_string(),
            });
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Paths must be unique within a route table; one route maps to exactly
    /// one composed handler.
    fn check_duplicate_paths(routes: &[Route]) -> Result<(), Vec<ValidationError>> {
        let mut seen = HashSet::new();
        let mut errors = Vec::new();

        for route in routes {
            if !seen.insert(route.path.as_str()) {
                errors.push(ValidationError::RouteConflict {
                    message: format!("duplicate route path '{}'", route.path),
                });
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("  {}. {e}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
