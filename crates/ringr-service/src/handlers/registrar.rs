//! Endpoint registrar - subscribes a phone number and records it.

use super::required;
use crate::config::RingrConfig;
use crate::error::RingrError;
use crate::types::EndpointRequest;
use crate::utils::{authorize, sanitize_endpoint, ApiResponse};
use channel_client::NotificationChannel;
use endpoint_store::{EndpointRecord, RecordStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct EndpointRegistrar {
    channel: Arc<dyn NotificationChannel>,
    store: Arc<dyn RecordStore>,
    config: Arc<RingrConfig>,
}

impl EndpointRegistrar {
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        store: Arc<dyn RecordStore>,
        config: Arc<RingrConfig>,
    ) -> Self {
        Self {
            channel,
            store,
            config,
        }
    }

    /// Register an endpoint and return the response envelope.
    #[instrument(skip_all)]
    pub async fn handle(&self, request: &EndpointRequest) -> ApiResponse {
        self.register(request)
            .await
            .unwrap_or_else(ApiResponse::from)
    }

    async fn register(&self, request: &EndpointRequest) -> Result<ApiResponse, RingrError> {
        let secret = self.config.auth_key()?;
        let table = self.config.table_name()?;
        let topic = self.config.topic()?;

        let auth_key = required(&request.auth_key, "auth_key")?;
        let endpoint = required(&request.endpoint, "endpoint")?;

        if !authorize(auth_key, secret) {
            warn!("Registration rejected: authorization failed");
            return Err(RingrError::Unauthorized);
        }

        let sanitized = sanitize_endpoint(endpoint).ok_or(RingrError::InvalidEndpoint)?;

        let subscription_id = self
            .channel
            .subscribe(topic, sanitized.protocol, &sanitized.endpoint)
            .await
            .map_err(|e| RingrError::channel(e, "Error creating subscription"))?;

        // A failed write leaves the subscription in place
        let record = EndpointRecord::new(
            sanitized.endpoint.clone(),
            subscription_id,
            sanitized.protocol.as_str(),
            self.config.ttl(),
        );
        self.store
            .put_item(table, record)
            .await
            .map_err(|e| RingrError::store(e, "Error creating database record"))?;

        info!(endpoint = %sanitized.endpoint, "Endpoint registered");
        Ok(ApiResponse::success())
    }
}
