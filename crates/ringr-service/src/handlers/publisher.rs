//! Notification publisher - broadcasts a message to every subscriber.

use super::{required, MESSAGE_SUBJECT};
use crate::config::RingrConfig;
use crate::error::RingrError;
use crate::types::PublishRequest;
use crate::utils::{authorize, ApiResponse};
use channel_client::NotificationChannel;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct NotificationPublisher {
    channel: Arc<dyn NotificationChannel>,
    config: Arc<RingrConfig>,
}

impl NotificationPublisher {
    pub fn new(channel: Arc<dyn NotificationChannel>, config: Arc<RingrConfig>) -> Self {
        Self { channel, config }
    }

    /// Publish a message and return the response envelope.
    #[instrument(skip_all)]
    pub async fn handle(&self, request: &PublishRequest) -> ApiResponse {
        self.publish(request).await.unwrap_or_else(ApiResponse::from)
    }

    async fn publish(&self, request: &PublishRequest) -> Result<ApiResponse, RingrError> {
        let secret = self.config.auth_key()?;
        let topic = self.config.topic()?;

        let auth_key = required(&request.auth_key, "auth_key")?;

        if !authorize(auth_key, secret) {
            warn!("Publish rejected: authorization failed");
            return Err(RingrError::Unauthorized);
        }

        let message = match request.message.as_deref() {
            Some(message) => message,
            None => self.config.default_message()?,
        };

        let message_id = self
            .channel
            .publish(topic, MESSAGE_SUBJECT, message)
            .await
            .map_err(|e| RingrError::channel(e, "Error publishing message"))?;

        info!(message_id = %message_id, "Notification published");
        Ok(ApiResponse::success())
    }
}
