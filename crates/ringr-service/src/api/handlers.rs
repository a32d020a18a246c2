//! HTTP request handlers.

use super::types::{HealthResponse, StreamBatch};
use super::AppState;
use crate::error::RingrError;
use crate::handlers::ReconcileOutcome;
use crate::types::{EndpointRequest, PublishRequest};
use crate::utils::{authorize, ApiResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{info, warn};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let record_count = match state.config.table_name() {
        Ok(table) => state.store.item_count(table).await.unwrap_or(0),
        Err(_) => 0,
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        record_count,
        channel_healthy: state.channel.health_check().await,
        missing_config: state.config.missing(),
    })
}

/// Register an endpoint.
pub async fn register_endpoint(
    State(state): State<AppState>,
    payload: Result<Json<EndpointRequest>, JsonRejection>,
) -> ApiResponse {
    match payload {
        Ok(Json(request)) => state.registrar.handle(&request).await,
        Err(rejection) => RingrError::MalformedRequest(rejection.body_text()).into(),
    }
}

/// Remove an endpoint.
pub async fn remove_endpoint(
    State(state): State<AppState>,
    payload: Result<Json<EndpointRequest>, JsonRejection>,
) -> ApiResponse {
    match payload {
        Ok(Json(request)) => state.remover.handle(&request).await,
        Err(rejection) => RingrError::MalformedRequest(rejection.body_text()).into(),
    }
}

/// Broadcast a message to all subscribers.
pub async fn publish_notification(
    State(state): State<AppState>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> ApiResponse {
    match payload {
        Ok(Json(request)) => state.publisher.handle(&request).await,
        Err(rejection) => RingrError::MalformedRequest(rejection.body_text()).into(),
    }
}

/// Reconcile a batch of change-stream records pushed by an external feed.
///
/// The body lists one outcome per record, in order.
pub async fn reconcile_stream(
    State(state): State<AppState>,
    payload: Result<Json<StreamBatch>, JsonRejection>,
) -> Result<ApiResponse, RingrError> {
    let Json(batch) = payload.map_err(|r| RingrError::MalformedRequest(r.body_text()))?;

    let secret = state.config.auth_key()?;
    let auth_key = batch
        .auth_key
        .as_deref()
        .ok_or(RingrError::MissingField("auth_key"))?;
    if !authorize(auth_key, secret) {
        warn!("Stream batch rejected: authorization failed");
        return Err(RingrError::Unauthorized);
    }

    let mut outcomes = Vec::with_capacity(batch.records.len());
    for record in &batch.records {
        let outcome = match record.to_change_event() {
            Ok(event) => state.reconciler.reconcile(&event).await,
            Err(error) => ReconcileOutcome::Error { error },
        };
        outcomes.push(outcome);
    }

    info!(records = outcomes.len(), "Stream batch reconciled");
    Ok(ApiResponse::new(
        200,
        serde_json::to_value(outcomes).unwrap_or_default(),
    ))
}
