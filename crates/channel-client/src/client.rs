//! Pub/sub gateway HTTP client.

use crate::channel::NotificationChannel;
use crate::error::ChannelError;
use crate::types::*;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};
use urlencoding::encode;

/// HTTP client for a pub/sub gateway fronting the broadcast topic.
#[derive(Clone)]
pub struct HttpChannelClient {
    client: Client,
    base_url: String,
}

impl HttpChannelClient {
    /// Create a new gateway client.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ChannelError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Turn a non-success response into a [`ChannelError::Status`].
    async fn check(response: Response, operation: &str) -> Result<Response, ChannelError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %message, "{} failed", operation);
        Err(ChannelError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl NotificationChannel for HttpChannelClient {
    #[instrument(skip(self))]
    async fn subscribe(
        &self,
        topic: &str,
        protocol: Protocol,
        endpoint: &str,
    ) -> Result<String, ChannelError> {
        let request = SubscribeRequest {
            protocol,
            endpoint: endpoint.to_string(),
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/topics/{}/subscriptions",
                self.base_url,
                encode(topic)
            ))
            .json(&request)
            .send()
            .await?;

        let response = Self::check(response, "Subscribe").await?;
        let body: SubscribeResponse = response.json().await?;

        debug!(subscription_id = %body.subscription_id, "Subscribed endpoint");
        Ok(body.subscription_id)
    }

    #[instrument(skip(self))]
    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .delete(format!(
                "{}/v1/subscriptions/{}",
                self.base_url,
                encode(subscription_id)
            ))
            .send()
            .await?;

        // Unknown subscriptions are already gone
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Subscription already absent");
            return Ok(());
        }

        Self::check(response, "Unsubscribe").await?;
        debug!("Removed subscription");
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn publish(
        &self,
        topic: &str,
        subject: &str,
        message: &str,
    ) -> Result<String, ChannelError> {
        let request = PublishRequest {
            subject: subject.to_string(),
            message: message.to_string(),
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/topics/{}/messages",
                self.base_url,
                encode(topic)
            ))
            .json(&request)
            .send()
            .await?;

        let response = Self::check(response, "Publish").await?;
        let body: PublishResponse = response.json().await?;

        debug!(message_id = %body.message_id, "Published message");
        Ok(body.message_id)
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
