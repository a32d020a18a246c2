//! Background reconciliation of the record store's change feed.

use crate::handlers::{EndpointReconciler, ReconcileOutcome};
use endpoint_store::{ChangeFeed, TableChange};
use std::sync::Arc;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Feeds every change on one table through the reconciler.
pub struct ChangeFeedWorker {
    reconciler: Arc<EndpointReconciler>,
    table: String,
}

impl ChangeFeedWorker {
    pub fn new(reconciler: Arc<EndpointReconciler>, table: impl Into<String>) -> Self {
        Self {
            reconciler,
            table: table.into(),
        }
    }

    /// Reconcile a single change. Changes to other tables are skipped.
    pub async fn handle(&self, change: &TableChange) -> Option<ReconcileOutcome> {
        if change.table != self.table {
            debug!(table = %change.table, "Ignoring change on another table");
            return None;
        }

        let outcome = self.reconciler.reconcile(&change.event).await;
        match &outcome {
            ReconcileOutcome::Failed { error, .. } | ReconcileOutcome::Error { error } => {
                warn!(endpoint = ?change.event.endpoint(), "Reconcile failed: {}", error);
            }
            other => debug!(?other, "Change reconciled"),
        }
        Some(outcome)
    }

    /// Consume the feed until the store is dropped.
    pub async fn run(&self, feed: ChangeFeed) {
        info!(table = %self.table, "Change feed worker started");

        let mut stream = Box::pin(feed.stream());
        while let Some(change) = stream.next().await {
            self.handle(&change).await;
        }

        info!("Change feed closed, worker stopping");
    }
}

/// Spawn the change feed worker as a background task.
pub fn spawn_worker(
    reconciler: Arc<EndpointReconciler>,
    table: impl Into<String>,
    feed: ChangeFeed,
) -> tokio::task::JoinHandle<()> {
    let worker = ChangeFeedWorker::new(reconciler, table);

    tokio::spawn(async move {
        worker.run(feed).await;
    })
}
