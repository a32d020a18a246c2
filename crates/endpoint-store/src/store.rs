//! Record store abstraction and the in-memory implementation.

use crate::error::StoreError;
use crate::feed::ChangeFeed;
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, instrument};

/// Changes buffered per feed consumer before writers wait on it.
pub const FEED_CAPACITY: usize = 1024;

/// Key-value operations on endpoint records, keyed by endpoint.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace the record for `record.endpoint`.
    async fn put_item(&self, table: &str, record: EndpointRecord) -> Result<(), StoreError>;

    /// Fetch a live record. Expired records read as absent.
    async fn get_item(
        &self,
        table: &str,
        endpoint: &str,
    ) -> Result<Option<EndpointRecord>, StoreError>;

    /// Delete a record, returning what was removed.
    async fn delete_item(
        &self,
        table: &str,
        endpoint: &str,
    ) -> Result<Option<EndpointRecord>, StoreError>;

    /// Number of live records in a table.
    async fn item_count(&self, table: &str) -> Result<usize, StoreError>;
}

/// In-memory record store with TTL expiry and a change feed.
///
/// Every mutation is published on the feed as a [`TableChange`], including
/// deletions performed by [`MemoryRecordStore::purge_expired`]. Each feed
/// consumer gets a bounded queue of [`FEED_CAPACITY`] changes; when a queue is
/// full the writer waits for that consumer, so no change is ever dropped.
#[derive(Clone)]
pub struct MemoryRecordStore {
    tables: Arc<RwLock<HashMap<String, HashMap<String, EndpointRecord>>>>,
    feeds: Arc<Mutex<Vec<mpsc::Sender<TableChange>>>>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    /// Create a store with no tables.
    pub fn new() -> Self {
        Self::from_tables(HashMap::new())
    }

    /// Create a store with one empty table.
    pub fn with_table(table: impl Into<String>) -> Self {
        let table = table.into();
        info!(table = %table, "In-memory record store initialized");
        Self::from_tables(HashMap::from([(table, HashMap::new())]))
    }

    fn from_tables(tables: HashMap<String, HashMap<String, EndpointRecord>>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(tables)),
            feeds: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a table if it does not already exist.
    pub async fn create_table(&self, table: &str) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default();
    }

    /// Subscribe to the change feed. Only changes made after this call are seen.
    ///
    /// A feed that is held but never read stalls writers once its queue fills;
    /// drop it to unsubscribe.
    pub fn changes(&self) -> ChangeFeed {
        let (sender, receiver) = mpsc::channel(FEED_CAPACITY);
        self.feeds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        ChangeFeed::new(receiver)
    }

    async fn emit(&self, table: &str, event: ChangeEvent) {
        let senders: Vec<_> = {
            let mut feeds = self.feeds.lock().unwrap_or_else(PoisonError::into_inner);
            feeds.retain(|sender| !sender.is_closed());
            feeds.clone()
        };
        if senders.is_empty() {
            debug!("No change feed consumers, dropping event");
            return;
        }

        let change = TableChange {
            table: table.to_string(),
            event,
        };
        for sender in senders {
            // Err only when the consumer went away meanwhile
            if sender.send(change.clone()).await.is_err() {
                debug!("Change feed consumer closed");
            }
        }
    }

    /// Remove every record that expired at or before `now`.
    ///
    /// Each removal is published as a deleted event. Returns the removed records.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Vec<(String, EndpointRecord)> {
        let mut purged = Vec::new();
        {
            let mut tables = self.tables.write().await;
            for (table, records) in tables.iter_mut() {
                let expired: Vec<String> = records
                    .values()
                    .filter(|r| r.is_expired(now))
                    .map(|r| r.endpoint.clone())
                    .collect();

                for endpoint in expired {
                    if let Some(record) = records.remove(&endpoint) {
                        purged.push((table.clone(), record));
                    }
                }
            }
        }

        for (table, record) in &purged {
            self.emit(table, ChangeEvent::deleted(record)).await;
        }

        if !purged.is_empty() {
            debug!("Purged {} expired records", purged.len());
        }
        purged
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    #[instrument(skip(self, record), fields(endpoint = %record.endpoint))]
    async fn put_item(&self, table: &str, record: EndpointRecord) -> Result<(), StoreError> {
        if record.endpoint.is_empty() {
            return Err(StoreError::InvalidKey("endpoint must not be empty".into()));
        }

        let previous = {
            let mut tables = self.tables.write().await;
            let records = tables
                .get_mut(table)
                .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
            records.insert(record.endpoint.clone(), record.clone())
        };

        let event = match previous {
            Some(old) => ChangeEvent::updated(&old, &record),
            None => ChangeEvent::created(&record),
        };
        self.emit(table, event).await;

        debug!("Record written");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_item(
        &self,
        table: &str,
        endpoint: &str,
    ) -> Result<Option<EndpointRecord>, StoreError> {
        let tables = self.tables.read().await;
        let records = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let now = Utc::now();

        Ok(records
            .get(endpoint)
            .filter(|r| !r.is_expired(now))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn delete_item(
        &self,
        table: &str,
        endpoint: &str,
    ) -> Result<Option<EndpointRecord>, StoreError> {
        let removed = {
            let mut tables = self.tables.write().await;
            let records = tables
                .get_mut(table)
                .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
            records.remove(endpoint)
        };

        if let Some(record) = &removed {
            self.emit(table, ChangeEvent::deleted(record)).await;
            debug!("Record deleted");
        }
        Ok(removed)
    }

    async fn item_count(&self, table: &str) -> Result<usize, StoreError> {
        let tables = self.tables.read().await;
        let records = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let now = Utc::now();
        Ok(records.values().filter(|r| !r.is_expired(now)).count())
    }
}
