//! Channel client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ChannelError {
    /// Status code the channel service reported for this failure.
    ///
    /// Transport failures that never produced a response count as 502.
    pub fn status(&self) -> u16 {
        match self {
            ChannelError::Http(e) => e.status().map(|s| s.as_u16()).unwrap_or(502),
            ChannelError::Json(_) => 502,
            ChannelError::Status { status, .. } => *status,
            ChannelError::InvalidRequest(_) => 400,
        }
    }
}
