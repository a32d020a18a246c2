//! HTTP API for the Ringr handlers.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;

use crate::config::RingrConfig;
use crate::handlers::{
    EndpointReconciler, EndpointRegistrar, EndpointRemover, NotificationPublisher,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use channel_client::NotificationChannel;
use endpoint_store::RecordStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registrar: Arc<EndpointRegistrar>,
    pub remover: Arc<EndpointRemover>,
    pub reconciler: Arc<EndpointReconciler>,
    pub publisher: Arc<NotificationPublisher>,
    /// Channel backend, for health checks
    pub channel: Arc<dyn NotificationChannel>,
    /// Record store backend, for health checks
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<RingrConfig>,
}

impl AppState {
    /// Build the handlers over the given backends.
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        store: Arc<dyn RecordStore>,
        config: Arc<RingrConfig>,
    ) -> Self {
        Self {
            registrar: Arc::new(EndpointRegistrar::new(
                channel.clone(),
                store.clone(),
                config.clone(),
            )),
            remover: Arc::new(EndpointRemover::new(
                channel.clone(),
                store.clone(),
                config.clone(),
            )),
            reconciler: Arc::new(EndpointReconciler::new(channel.clone())),
            publisher: Arc::new(NotificationPublisher::new(channel.clone(), config.clone())),
            channel,
            store,
            config,
        }
    }
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(60))
}

/// Create the API router with custom rate limiting.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let v1 = Router::new()
        .route("/v1/endpoints", post(handlers::register_endpoint))
        .route("/v1/endpoints/remove", post(handlers::remove_endpoint))
        .route("/v1/publish", post(handlers::publish_notification))
        .route("/v1/stream", post(handlers::reconcile_stream))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        // Health check (no rate limiting)
        .route("/health", get(handlers::health))
        .merge(v1)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
