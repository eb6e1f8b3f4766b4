//! `POST /proxy` body extraction and validation rejections.
//!
//! # Responsibilities
//! - Read the body (size limited by `DefaultBodyLimit`)
//! - Accept a JSON content type, or none at all
//! - Run schema validation before the relay is ever invoked
//! - Render failures as `422 {"detail": [...]}`

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::observability::metrics;
use crate::relay::request::{validate, FieldError, RequestDescription, SchemaValidationError};

/// A validated `RequestDescription` taken from the request body.
#[derive(Debug)]
pub struct RelayRequest(pub RequestDescription);

/// Why a body was not accepted as a `RequestDescription`.
#[derive(Debug)]
pub struct ValidationRejection {
    status: StatusCode,
    error: SchemaValidationError,
}

impl ValidationRejection {
    fn unprocessable(error: impl Into<SchemaValidationError>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            error: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn error(&self) -> &SchemaValidationError {
        &self.error
    }
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        metrics::record_validation_rejection();
        tracing::debug!(status = %self.status, error = %self.error, "Rejected request description");
        (self.status, Json(self.error)).into_response()
    }
}

impl<S> FromRequest<S> for RelayRequest
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json_body = accepts_json(req.headers());

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            ValidationRejection {
                status: rejection.status(),
                error: FieldError::body_error(rejection.body_text(), "body_read").into(),
            }
        })?;

        if !json_body {
            return Err(ValidationRejection::unprocessable(FieldError::body_error(
                "Input should be a valid dictionary or object to extract fields from",
                "model_attributes_type",
            )));
        }
        if bytes.is_empty() {
            return Err(ValidationRejection::unprocessable(FieldError::body_error(
                "Field required",
                "missing",
            )));
        }

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ValidationRejection::unprocessable(FieldError::json_invalid(e)))?;

        validate(&value)
            .map(RelayRequest)
            .map_err(ValidationRejection::unprocessable)
    }
}

/// No content type, `application/json`, or any `application/*+json`.
fn accepts_json(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return true;
    };
    let Ok(value) = value.to_str() else {
        return false;
    };
    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.split_once('/') {
        Some(("application", subtype)) => subtype == "json" || subtype.ends_with("+json"),
        _ => false,
    }
}
