//! Relay error types and response handling
//!
//! Everything that can go wrong between accepting a request and answering it
//! ends up here. `IntoResponse` is the only place that decides status codes
//! and client-facing wording; provider details stay in the logs.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::models::ErrorBody;
use super::upstream::UpstreamError;

pub(crate) const MESSAGES_REQUIRED: &str = "Messages array is required";

/// Errors surfaced by the relay endpoints
#[derive(Debug, Error)]
pub(crate) enum RelayError {
    /// Missing or malformed request body
    #[error("invalid request body")]
    InvalidRequest,

    /// Local per-client limiter said no
    #[error("too many requests (retry after {retry_after:?})")]
    RateLimited { retry_after: Duration },

    /// Upstream call failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Anything unexpected inside the pipeline
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Status code, short label, client message
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            RelayError::InvalidRequest => {
                (StatusCode::BAD_REQUEST, "Bad request", MESSAGES_REQUIRED)
            }
            RelayError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests",
                "Please try again later",
            ),
            RelayError::Upstream(kind) => match kind {
                UpstreamError::AuthConfig => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error",
                    "API service configuration issue",
                ),
                UpstreamError::RateLimited => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Rate limited",
                    "AI service is busy. Please try again in a moment.",
                ),
                UpstreamError::Unavailable { .. } => (
                    StatusCode::BAD_GATEWAY,
                    "AI service temporarily unavailable",
                    "Please try again in a moment",
                ),
                UpstreamError::Timeout(_) => (
                    StatusCode::GATEWAY_TIMEOUT,
                    "Request timeout",
                    "The AI service is taking too long to respond",
                ),
                UpstreamError::EmptyResponse => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "Unable to process your request at this time",
                ),
                UpstreamError::Network(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service unavailable",
                    "Cannot connect to AI service",
                ),
            },
            RelayError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                "Something went wrong",
            ),
        }
    }

    pub(crate) fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, label, message) = self.parts();

        let mut response = (status, Json(ErrorBody::new(label, message))).into_response();

        if let RelayError::RateLimited { retry_after } = &self {
            // Round up so clients never retry a moment too early
            let secs = retry_after
                .as_secs()
                .saturating_add(u64::from(retry_after.subsec_nanos() > 0));
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Generic 500 for panics caught by the outer `CatchPanicLayer`
pub(crate) fn panic_response() -> Response {
    tracing::error!("Handler panicked; returning generic error");
    RelayError::Internal("handler panicked".to_string()).into_response()
}
