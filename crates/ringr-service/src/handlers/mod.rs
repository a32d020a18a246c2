//! Request handlers.
//!
//! Each handler is a short sequential script: check configuration, validate
//! the required fields, authorize, sanitize, call the backends and shape the
//! result as an [`ApiResponse`](crate::utils::ApiResponse).

mod publisher;
mod reconciler;
mod registrar;
mod remover;

pub use publisher::NotificationPublisher;
pub use reconciler::{EndpointReconciler, ReconcileOutcome};
pub use registrar::EndpointRegistrar;
pub use remover::EndpointRemover;

use crate::error::RingrError;

/// Subject attached to every broadcast.
pub const MESSAGE_SUBJECT: &str = "Ringr";

/// Return a required request field or the 400 error naming it.
fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RingrError> {
    value.as_deref().ok_or(RingrError::MissingField(field))
}
