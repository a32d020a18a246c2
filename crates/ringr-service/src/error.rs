//! Error types for the Ringr handlers.

use crate::utils::ApiResponse;
use axum::response::{IntoResponse, Response};
use channel_client::ChannelError;
use endpoint_store::StoreError;
use thiserror::Error;
use tracing::warn;

/// Handler error types. Each maps to one response envelope.
#[derive(Debug, Error)]
pub enum RingrError {
    #[error("ERROR: Environmental variable '{0}' not defined")]
    MissingConfig(&'static str),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Authorization failed")]
    Unauthorized,

    #[error("Endpoint not valid phone number")]
    InvalidEndpoint,

    #[error("Endpoint not found")]
    EndpointNotFound,

    /// A backend refused the operation; `message` is the fixed client-facing text.
    #[error("{message}")]
    Backend {
        status: u16,
        message: &'static str,
        detail: String,
    },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl RingrError {
    /// Wrap a channel failure, keeping the status it reported.
    pub fn channel(err: ChannelError, message: &'static str) -> Self {
        warn!(status = err.status(), error = %err, "{}", message);
        RingrError::Backend {
            status: err.status(),
            message,
            detail: err.to_string(),
        }
    }

    /// Wrap a record store failure, keeping the status it reported.
    pub fn store(err: StoreError, message: &'static str) -> Self {
        warn!(status = err.status(), error = %err, "{}", message);
        RingrError::Backend {
            status: err.status(),
            message,
            detail: err.to_string(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            RingrError::MissingConfig(_) => 500,
            RingrError::MissingField(_) => 400,
            RingrError::MalformedRequest(_) => 400,
            RingrError::Unauthorized => 403,
            RingrError::InvalidEndpoint => 400,
            RingrError::EndpointNotFound => 404,
            RingrError::Backend { status, .. } => *status,
            RingrError::RateLimitExceeded => 429,
        }
    }
}

impl From<RingrError> for ApiResponse {
    fn from(err: RingrError) -> Self {
        ApiResponse::new(err.status(), err.to_string())
    }
}

impl IntoResponse for RingrError {
    fn into_response(self) -> Response {
        ApiResponse::from(self).into_response()
    }
}
