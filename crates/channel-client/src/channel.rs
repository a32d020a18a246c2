//! Notification channel abstraction.

use crate::error::ChannelError;
use crate::types::Protocol;
use async_trait::async_trait;

/// Pub/sub topic operations consumed by the Ringr handlers.
///
/// Implementations report backend refusals as [`ChannelError::Status`] so
/// callers can surface the status code unchanged.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Subscribe an endpoint to a topic and return its subscription identifier.
    async fn subscribe(
        &self,
        topic: &str,
        protocol: Protocol,
        endpoint: &str,
    ) -> Result<String, ChannelError>;

    /// Remove a subscription by identifier.
    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), ChannelError>;

    /// Publish a message to every subscriber of a topic. Returns the message identifier.
    async fn publish(
        &self,
        topic: &str,
        subject: &str,
        message: &str,
    ) -> Result<String, ChannelError>;

    /// Check whether the channel service is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}
