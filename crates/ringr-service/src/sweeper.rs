//! Expiry sweeper.
//!
//! Periodically purges records whose TTL has passed. Each purge lands on the
//! change feed as a deletion, so the feed worker retires the subscription.

use endpoint_store::MemoryRecordStore;
use std::time::Duration;
use tracing::{debug, info};

/// Purges expired records on a fixed interval.
pub struct ExpirySweeper {
    store: MemoryRecordStore,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(store: MemoryRecordStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run a single purge. Returns the number of records removed.
    pub async fn sweep_once(&self) -> usize {
        let purged = self.store.purge_expired(chrono::Utc::now()).await;

        for (table, record) in &purged {
            info!(
                table = %table,
                endpoint = %record.endpoint,
                subscription_id = %record.subscription_id,
                "Record expired"
            );
        }
        purged.len()
    }

    /// Run the sweeper until the task is aborted.
    pub async fn run(&self) {
        info!("Starting expiry sweeper, interval: {:?}", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let purged = self.sweep_once().await;
            if purged == 0 {
                debug!("No expired records this cycle");
            } else {
                info!("Sweep cycle complete: {} records purged", purged);
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Spawn the expiry sweeper as a background task.
pub fn spawn_sweeper(store: MemoryRecordStore, interval: Duration) -> tokio::task::JoinHandle<()> {
    let sweeper = ExpirySweeper::new(store, interval);

    tokio::spawn(async move {
        sweeper.run().await;
    })
}
