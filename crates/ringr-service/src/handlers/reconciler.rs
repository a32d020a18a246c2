//! Endpoint reconciler - retires channel subscriptions that no longer have
//! a live record.
//!
//! Created events are ignored. Updated events unsubscribe the old identifier
//! only when it changed. Deleted events always unsubscribe the old identifier.

use channel_client::NotificationChannel;
use endpoint_store::{ChangeEvent, ChangeKind, RecordImage};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of reconciling one change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Created event, nothing to do
    Ignored,
    /// Updated event whose subscription identifier did not change
    Unchanged,
    /// The stale subscription was removed
    Unsubscribed { subscription_id: String },
    /// The channel refused the unsubscribe
    Failed {
        subscription_id: String,
        status: u16,
        error: String,
    },
    /// The event could not be interpreted
    Error { error: String },
}

pub struct EndpointReconciler {
    channel: Arc<dyn NotificationChannel>,
}

impl EndpointReconciler {
    pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
        Self { channel }
    }

    /// Reconcile one event.
    #[instrument(skip_all, fields(kind = ?event.kind, endpoint = event.endpoint()))]
    pub async fn reconcile(&self, event: &ChangeEvent) -> ReconcileOutcome {
        match event.kind {
            ChangeKind::Created => {
                debug!("Record created, nothing to reconcile");
                ReconcileOutcome::Ignored
            }
            ChangeKind::Updated => {
                let new_id = match subscription_id(event.new.as_ref(), "new") {
                    Ok(id) => id,
                    Err(outcome) => return outcome,
                };
                let old_id = match subscription_id(event.old.as_ref(), "old") {
                    Ok(id) => id,
                    Err(outcome) => return outcome,
                };

                if new_id == old_id {
                    debug!("Subscription unchanged");
                    return ReconcileOutcome::Unchanged;
                }
                self.retire(old_id).await
            }
            ChangeKind::Deleted => match subscription_id(event.old.as_ref(), "old") {
                Ok(old_id) => self.retire(old_id).await,
                Err(outcome) => outcome,
            },
        }
    }

    /// Reconcile a batch in order. A failed event does not stop the batch.
    pub async fn reconcile_batch(&self, events: &[ChangeEvent]) -> Vec<ReconcileOutcome> {
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            outcomes.push(self.reconcile(event).await);
        }
        outcomes
    }

    async fn retire(&self, subscription_id: &str) -> ReconcileOutcome {
        match self.channel.unsubscribe(subscription_id).await {
            Ok(()) => {
                info!(subscription_id = %subscription_id, "Stale subscription removed");
                ReconcileOutcome::Unsubscribed {
                    subscription_id: subscription_id.to_string(),
                }
            }
            Err(e) => {
                warn!(subscription_id = %subscription_id, error = %e, "Unsubscribe failed");
                ReconcileOutcome::Failed {
                    subscription_id: subscription_id.to_string(),
                    status: e.status(),
                    error: e.to_string(),
                }
            }
        }
    }
}

fn subscription_id<'a>(
    image: Option<&'a RecordImage>,
    which: &str,
) -> Result<&'a str, ReconcileOutcome> {
    image
        .and_then(|i| i.subscription_id.as_deref())
        .ok_or_else(|| {
            warn!("Change event {} image has no subscription_id", which);
            ReconcileOutcome::Error {
                error: format!("ERROR: '{}' image subscription_id not found", which),
            }
        })
}
