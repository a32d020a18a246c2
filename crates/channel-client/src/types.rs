//! Channel API types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery protocol of a channel subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Sms,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Sms => "sms",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscribe request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub protocol: Protocol,
    pub endpoint: String,
}

/// Subscribe response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub subscription_id: String,
}

/// Publish request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub subject: String,
    pub message: String,
}

/// Publish response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub message_id: String,
}

/// A live subscription held by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub subscription_id: String,
    pub topic: String,
    pub protocol: Protocol,
    pub endpoint: String,
}

/// A message handed to one subscriber by a publish.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: String,
    pub subscription_id: String,
    pub endpoint: String,
    pub subject: String,
    pub message: String,
}
