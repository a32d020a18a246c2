//! In-process notification channel.

use crate::channel::NotificationChannel;
use crate::error::ChannelError;
use crate::types::{Delivery, Protocol, Subscription};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Deliveries kept by [`MemoryChannel::new`].
pub const DEFAULT_DELIVERY_HISTORY: usize = 1000;

#[derive(Default)]
struct ChannelState {
    /// Subscriptions indexed by subscription identifier
    subscriptions: HashMap<String, Subscription>,
    /// Most recent deliveries, oldest first
    deliveries: VecDeque<Delivery>,
}

/// In-memory channel used when no gateway is configured, and in tests.
///
/// Subscribing an endpoint that is already subscribed to the topic returns
/// the existing identifier. Unsubscribing an unknown identifier succeeds.
/// Only the most recent deliveries are kept.
#[derive(Clone)]
pub struct MemoryChannel {
    state: Arc<RwLock<ChannelState>>,
    delivery_history: usize,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::with_delivery_history(DEFAULT_DELIVERY_HISTORY)
    }

    /// Create a channel that keeps at most `limit` deliveries.
    pub fn with_delivery_history(limit: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChannelState::default())),
            delivery_history: limit,
        }
    }

    /// Live subscriptions on a topic.
    pub async fn subscriptions(&self, topic: &str) -> Vec<Subscription> {
        let state = self.state.read().await;
        let mut subs: Vec<Subscription> = state
            .subscriptions
            .values()
            .filter(|s| s.topic == topic)
            .cloned()
            .collect();
        subs.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        subs
    }

    /// Look up a subscription by identifier.
    pub async fn get(&self, subscription_id: &str) -> Option<Subscription> {
        self.state
            .read()
            .await
            .subscriptions
            .get(subscription_id)
            .cloned()
    }

    /// Retained deliveries, oldest first.
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.state.read().await.deliveries.iter().cloned().collect()
    }
}

#[async_trait]
impl NotificationChannel for MemoryChannel {
    #[instrument(skip(self))]
    async fn subscribe(
        &self,
        topic: &str,
        protocol: Protocol,
        endpoint: &str,
    ) -> Result<String, ChannelError> {
        if topic.is_empty() || endpoint.is_empty() {
            return Err(ChannelError::InvalidRequest(
                "Topic and endpoint must not be empty".into(),
            ));
        }

        let mut state = self.state.write().await;

        if let Some(existing) = state
            .subscriptions
            .values()
            .find(|s| s.topic == topic && s.protocol == protocol && s.endpoint == endpoint)
        {
            debug!(subscription_id = %existing.subscription_id, "Endpoint already subscribed");
            return Ok(existing.subscription_id.clone());
        }

        let subscription_id = format!("{}:{}", topic, Uuid::new_v4());
        state.subscriptions.insert(
            subscription_id.clone(),
            Subscription {
                subscription_id: subscription_id.clone(),
                topic: topic.to_string(),
                protocol,
                endpoint: endpoint.to_string(),
            },
        );

        info!(subscription_id = %subscription_id, "Subscription created");
        Ok(subscription_id)
    }

    #[instrument(skip(self))]
    async fn unsubscribe(&self, subscription_id: &str) -> Result<(), ChannelError> {
        let mut state = self.state.write().await;
        if state.subscriptions.remove(subscription_id).is_some() {
            info!("Subscription removed");
        } else {
            debug!("Subscription already absent");
        }
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn publish(
        &self,
        topic: &str,
        subject: &str,
        message: &str,
    ) -> Result<String, ChannelError> {
        let message_id = Uuid::new_v4().to_string();
        let mut state = self.state.write().await;

        let deliveries: Vec<Delivery> = state
            .subscriptions
            .values()
            .filter(|s| s.topic == topic)
            .map(|s| Delivery {
                message_id: message_id.clone(),
                subscription_id: s.subscription_id.clone(),
                endpoint: s.endpoint.clone(),
                subject: subject.to_string(),
                message: message.to_string(),
            })
            .collect();

        info!(message_id = %message_id, recipients = deliveries.len(), "Message published");
        state.deliveries.extend(deliveries);
        let excess = state.deliveries.len().saturating_sub(self.delivery_history);
        state.deliveries.drain(..excess);

        Ok(message_id)
    }
}
