//! Change feed consumer.

use crate::types::TableChange;
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// Receiving side of a record store's change feed.
///
/// Changes arrive in the order the store emitted them and none are skipped.
pub struct ChangeFeed {
    receiver: mpsc::Receiver<TableChange>,
}

impl ChangeFeed {
    pub(crate) fn new(receiver: mpsc::Receiver<TableChange>) -> Self {
        Self { receiver }
    }

    /// Wait for the next change. Returns `None` once the store is dropped.
    pub async fn next_change(&mut self) -> Option<TableChange> {
        self.receiver.recv().await
    }

    /// Consume the feed as an async stream.
    pub fn stream(mut self) -> impl Stream<Item = TableChange> {
        async_stream::stream! {
            while let Some(change) = self.next_change().await {
                yield change;
            }
        }
    }
}
