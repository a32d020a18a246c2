//! Endpoint record and change event types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A subscribed endpoint as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    /// Normalized phone number, the record key
    pub endpoint: String,

    /// Opaque identifier returned by the channel service
    pub subscription_id: String,

    /// Channel protocol tag (e.g. "sms")
    pub protocol: String,

    /// When the record expires and becomes eligible for purging
    pub expires_at: DateTime<Utc>,
}

impl EndpointRecord {
    /// Create a record that expires `ttl` from now.
    pub fn new(
        endpoint: impl Into<String>,
        subscription_id: impl Into<String>,
        protocol: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            subscription_id: subscription_id.into(),
            protocol: protocol.into(),
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Kind of mutation recorded in the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Snapshot of a record attached to a change event.
///
/// Every attribute is optional: upstream feeds may deliver partial images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordImage {
    pub endpoint: Option<String>,
    pub subscription_id: Option<String>,
    pub protocol: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&EndpointRecord> for RecordImage {
    fn from(record: &EndpointRecord) -> Self {
        Self {
            endpoint: Some(record.endpoint.clone()),
            subscription_id: Some(record.subscription_id.clone()),
            protocol: Some(record.protocol.clone()),
            expires_at: Some(record.expires_at),
        }
    }
}

/// A single create/update/delete notification from the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// Record state before the change (updated and deleted events)
    pub old: Option<RecordImage>,
    /// Record state after the change (created and updated events)
    pub new: Option<RecordImage>,
}

impl ChangeEvent {
    pub fn created(record: &EndpointRecord) -> Self {
        Self {
            kind: ChangeKind::Created,
            old: None,
            new: Some(record.into()),
        }
    }

    pub fn updated(old: &EndpointRecord, new: &EndpointRecord) -> Self {
        Self {
            kind: ChangeKind::Updated,
            old: Some(old.into()),
            new: Some(new.into()),
        }
    }

    pub fn deleted(old: &EndpointRecord) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            old: Some(old.into()),
            new: None,
        }
    }

    /// Endpoint the event refers to, taken from whichever image carries it.
    pub fn endpoint(&self) -> Option<&str> {
        self.new
            .as_ref()
            .and_then(|i| i.endpoint.as_deref())
            .or_else(|| self.old.as_ref().and_then(|i| i.endpoint.as_deref()))
    }
}

/// A change event tagged with the table it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChange {
    pub table: String,
    pub event: ChangeEvent,
}
