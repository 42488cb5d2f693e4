//! HTTP-facing error type: wraps [`beacon_types::BeaconError`] and every
//! host-level failure (bad query params, missing resource) with the
//! status code and JSON body callers see, grounded on the teacher's
//! `ApiError` (riptide-api's `errors.rs`) but sized to this host's much
//! smaller surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use beacon_types::BeaconError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Beacon(#[from] BeaconError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Beacon(err) => match err {
                BeaconError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
                BeaconError::NotFound(_) => StatusCode::NOT_FOUND,
                BeaconError::InvalidUrl(_) | BeaconError::Json(_) | BeaconError::Custom(_) => {
                    StatusCode::BAD_REQUEST
                }
                BeaconError::Fatal(_) => StatusCode::SERVICE_UNAVAILABLE,
                BeaconError::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Beacon(err) => match err {
                BeaconError::TransientNetwork(_) => "transient_network",
                BeaconError::RateLimitExhausted(_) => "rate_limit_exhausted",
                BeaconError::MalformedEvent(_) => "malformed_event",
                BeaconError::Duplicate(_) => "duplicate",
                BeaconError::ProviderTimeout(_) => "provider_timeout",
                BeaconError::OntologyMiss(_) => "ontology_miss",
                BeaconError::EmbeddingUnavailable(_) => "embedding_unavailable",
                BeaconError::Configuration(_) => "configuration_error",
                BeaconError::NotFound(_) => "not_found",
                BeaconError::Fatal(_) => "fatal",
                _ => "internal_error",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();
        let message = self.to_string();

        match status {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => {
                tracing::error!(error_type, %message, "request failed");
            }
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                tracing::warn!(error_type, %message, "request rejected");
            }
            _ => tracing::info!(error_type, %message, "request error"),
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}
