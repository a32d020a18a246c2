//! Handler request types.

use serde::Deserialize;

/// Request to register or remove an endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointRequest {
    pub auth_key: Option<String>,

    /// Free-form phone number
    pub endpoint: Option<String>,
}

/// Request to broadcast a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishRequest {
    pub auth_key: Option<String>,

    /// Message text; the configured default is sent when absent
    pub message: Option<String>,
}
