//! Ringr - SMS broadcast subscription service.
//!
//! Callers register phone numbers against a broadcast topic, remove them,
//! and publish messages to every subscriber. Endpoint records expire after a
//! TTL; every record change is reconciled against the channel so stale
//! subscriptions are retired.

pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod sweeper;
pub mod types;
pub mod utils;
pub mod worker;

pub use config::Config;
pub use error::RingrError;
pub use handlers::{
    EndpointReconciler, EndpointRegistrar, EndpointRemover, NotificationPublisher,
    ReconcileOutcome,
};
pub use utils::ApiResponse;
