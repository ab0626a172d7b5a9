//! Realtime automation event types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity carried in the `type` field of a realtime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
}

/// Human-readable automation outcome broadcast to connected observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationEvent {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
    pub meta: Value,
    /// Emission time in epoch milliseconds
    pub ts: i64,
}

impl AutomationEvent {
    /// Creates an event stamped with the current time.
    pub fn now(severity: Severity, message: impl Into<String>, meta: Value) -> Self {
        Self {
            severity,
            message: message.into(),
            meta,
            ts: Utc::now().timestamp_millis(),
        }
    }
}
