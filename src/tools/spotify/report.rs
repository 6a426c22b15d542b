//! JSON results handed back to the model

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use crate::spotify::ApiError;

/// Tool result; unset fields are left out of the JSON entirely
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_track: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seeds: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracks_added: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
}

impl Report {
    /// Result of a state-changing action, stamped `completedAt`
    pub fn action(status: &'static str) -> Self {
        Self {
            status: Some(status),
            completed_at: Some(now()),
            ..Self::default()
        }
    }

    /// Result of a read, stamped `fetchedAt`
    pub fn read(status: &'static str) -> Self {
        Self {
            status: Some(status),
            fetched_at: Some(now()),
            ..Self::default()
        }
    }

    /// Mark as failed with a serialized provider or system error
    pub fn failed(mut self, err: ApiError) -> Self {
        tracing::warn!("Spotify call failed: {}", err);
        self.status = Some("failed");
        self.error = serde_json::to_value(&err).ok();
        self
    }

    /// Mark as failed with a plain message
    pub fn rejected(mut self, message: impl Into<String>) -> Self {
        self.status = Some("failed");
        self.error = Some(Value::String(message.into()));
        self
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(&self)
            .unwrap_or_else(|e| json!({ "status": "failed", "error": e.to_string() }))
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
