//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, value ranges and CORS origins
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field}: must not be empty")]
    Empty { field: &'static str },

    #[error("cors.allow_origins: '{0}' is not a valid origin")]
    InvalidOrigin(String),

    #[error("cors.allow_origins: '*' cannot be combined with explicit origins")]
    MixedWildcard,
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(
        &mut errors,
        "listener.bind_address",
        &config.listener.bind_address,
    );
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.client.timeout_secs == Some(0) {
        errors.push(ValidationError::Zero { field: "client.timeout_secs" });
    }
    if config.client.connect_timeout_secs == Some(0) {
        errors.push(ValidationError::Zero { field: "client.connect_timeout_secs" });
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "security.max_body_size" });
    }

    if config.static_files.enabled {
        if config.static_files.dir.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "static_files.dir" });
        }
        if config.static_files.index.trim().is_empty() {
            errors.push(ValidationError::Empty { field: "static_files.index" });
        }
    }

    let origins = &config.cors.allow_origins;
    if origins.is_empty() {
        errors.push(ValidationError::Empty { field: "cors.allow_origins" });
    } else if config.cors.allows_any_origin() {
        if origins.len() > 1 {
            errors.push(ValidationError::MixedWildcard);
        }
    } else {
        for origin in origins {
            if HeaderValue::from_str(origin).is_err() || url::Url::parse(origin).is_err() {
                errors.push(ValidationError::InvalidOrigin(origin.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
