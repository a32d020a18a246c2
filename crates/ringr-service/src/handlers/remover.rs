//! Endpoint remover - unsubscribes a phone number and deletes its record.

use super::required;
use crate::config::RingrConfig;
use crate::error::RingrError;
use crate::types::EndpointRequest;
use crate::utils::{authorize, sanitize_endpoint, ApiResponse};
use channel_client::NotificationChannel;
use endpoint_store::RecordStore;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct EndpointRemover {
    channel: Arc<dyn NotificationChannel>,
    store: Arc<dyn RecordStore>,
    config: Arc<RingrConfig>,
}

impl EndpointRemover {
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

    /// Remove an endpoint and return the response envelope.
    #[instrument(skip_all)]
    pub async fn handle(&self, request: &EndpointRequest) -> ApiResponse {
        self.remove(request).await.unwrap_or_else(ApiResponse::from)
    }

    async fn remove(&self, request: &EndpointRequest) -> Result<ApiResponse, RingrError> {
        let secret = self.config.auth_key()?;
        let table = self.config.table_name()?;

        let auth_key = required(&request.auth_key, "auth_key")?;
        let endpoint = required(&request.endpoint, "endpoint")?;

        if !authorize(auth_key, secret) {
            warn!("Removal rejected: authorization failed");
            return Err(RingrError::Unauthorized);
        }

        let sanitized = sanitize_endpoint(endpoint).ok_or(RingrError::InvalidEndpoint)?;

        let record = self
            .store
            .get_item(table, &sanitized.endpoint)
            .await
            .map_err(|e| RingrError::store(e, "Error fetching database record"))?
            .ok_or(RingrError::EndpointNotFound)?;

        self.channel
            .unsubscribe(&record.subscription_id)
            .await
            .map_err(|e| RingrError::channel(e, "Error removing subscription"))?;

        self.store
            .delete_item(table, &sanitized.endpoint)
            .await
            .map_err(|e| RingrError::store(e, "Error deleting database record"))?;

        info!(endpoint = %sanitized.endpoint, "Endpoint removed");
        Ok(ApiResponse::success())
    }
}
