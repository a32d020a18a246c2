//! API request and response types.

use chrono::{DateTime, Utc};
use endpoint_store::{ChangeEvent, ChangeKind, RecordImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub record_count: usize,
    pub channel_healthy: bool,
    pub missing_config: Vec<&'static str>,
}

/// Typed attribute map, e.g. `{"arn": {"S": "..."}, "ttl": {"N": "1536000000"}}`.
pub type AttributeMap = HashMap<String, serde_json::Value>;

/// A batch of change-stream records delivered to `/v1/stream`.
#[derive(Debug, Deserialize)]
pub struct StreamBatch {
    pub auth_key: Option<String>,

    #[serde(rename = "Records", default)]
    pub records: Vec<StreamRecord>,
}

/// One change-stream record.
#[derive(Debug, Deserialize)]
pub struct StreamRecord {
    /// INSERT, MODIFY or REMOVE
    #[serde(rename = "eventName")]
    pub event_name: String,

    #[serde(default)]
    pub dynamodb: StreamImages,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamImages {
    #[serde(rename = "NewImage")]
    pub new_image: Option<AttributeMap>,

    #[serde(rename = "OldImage")]
    pub old_image: Option<AttributeMap>,
}

impl StreamRecord {
    /// Convert to a change event. Fails only on an unknown event name.
    pub fn to_change_event(&self) -> Result<ChangeEvent, String> {
        let kind = match self.event_name.as_str() {
            "INSERT" => ChangeKind::Created,
            "MODIFY" => ChangeKind::Updated,
            "REMOVE" => ChangeKind::Deleted,
            other => return Err(format!("ERROR: unknown event name '{}'", other)),
        };

        Ok(ChangeEvent {
            kind,
            old: self.dynamodb.old_image.as_ref().map(image_from_attributes),
            new: self.dynamodb.new_image.as_ref().map(image_from_attributes),
        })
    }
}

fn image_from_attributes(attributes: &AttributeMap) -> RecordImage {
    RecordImage {
        endpoint: typed_attribute(attributes, "endpoint", "S").map(String::from),
        subscription_id: typed_attribute(attributes, "arn", "S").map(String::from),
        protocol: typed_attribute(attributes, "protocol", "S").map(String::from),
        expires_at: typed_attribute(attributes, "ttl", "N")
            .and_then(|n| n.parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
    }
}

fn typed_attribute<'a>(attributes: &'a AttributeMap, name: &str, kind: &str) -> Option<&'a str> {
    attributes.get(name)?.get(kind)?.as_str()
}
