//! Automation engine models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;
use crate::store::Collection;

/// Result of evaluating one cascade rule against one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The rule performed its effect.
    Fired(CascadeRecord),
    /// The rule did nothing.
    Skipped(SkipReason),
}

impl RuleOutcome {
    pub fn is_fired(&self) -> bool {
        matches!(self, RuleOutcome::Fired(_))
    }
}

/// Why a rule evaluation was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PreconditionUnmet,
    /// The origin already carries the downstream link.
    AlreadyLinked,
    /// A downstream entity already references the origin.
    TargetExists,
    NoOwningOpportunity,
    /// The owning opportunity already holds the target status.
    AlreadyInState,
}

/// What a fired rule did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeRecord {
    pub action: &'static str,
    pub source_collection: Collection,
    pub source_id: String,
    pub target_collection: Collection,
    pub target_id: String,
}

/// Which trigger source delivers entity writes to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSourceKind {
    ChangeFeed,
    LifecycleHooks,
}

impl fmt::Display for TriggerSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSourceKind::ChangeFeed => f.write_str("change_feed"),
            TriggerSourceKind::LifecycleHooks => f.write_str("lifecycle_hooks"),
        }
    }
}

/// Configured preference for the trigger source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerPreference {
    /// Use the live feed when the store topology supports it.
    #[default]
    Auto,
    /// Prefer the live feed; degrades to hooks when unavailable.
    Feed,
    /// Always use lifecycle hooks.
    Hooks,
}

impl FromStr for TriggerPreference {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(TriggerPreference::Auto),
            "feed" | "change_feed" | "change-feed" => Ok(TriggerPreference::Feed),
            "hooks" | "lifecycle_hooks" | "lifecycle-hooks" => Ok(TriggerPreference::Hooks),
            _ => Err(ValidationError::UnknownStatus {
                field: "trigger preference",
                value: s.to_string(),
            }),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationConfig {
    pub enabled: bool,
    pub trigger: TriggerPreference,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger: TriggerPreference::Auto,
        }
    }
}

/// Outcome of the one-time store topology probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum LiveFeedProbe {
    Available,
    Standalone,
    Failed(String),
}

impl LiveFeedProbe {
    pub fn is_available(&self) -> bool {
        matches!(self, LiveFeedProbe::Available)
    }
}

/// Lifecycle of one change feed subscription. `Error` and `Closed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Idle,
    Subscribed,
    Error,
    Closed,
}

impl SubscriptionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionState::Error | SubscriptionState::Closed)
    }
}

/// Snapshot of the engine returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationStatus {
    pub enabled: bool,
    pub preference: TriggerPreference,
    pub probe: Option<LiveFeedProbe>,
    pub trigger_source: Option<TriggerSourceKind>,
    pub subscriptions: BTreeMap<String, SubscriptionState>,
    pub hooked_collections: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_preference_parsing() {
        assert_eq!(
            " Hooks ".parse::<TriggerPreference>().unwrap(),
            TriggerPreference::Hooks
        );
        assert_eq!(
            "change-feed".parse::<TriggerPreference>().unwrap(),
            TriggerPreference::Feed
        );
        assert!("polling".parse::<TriggerPreference>().is_err());
    }

    #[test]
    fn test_probe_serialization() {
        let failed = serde_json::to_value(LiveFeedProbe::Failed("denied".to_string())).unwrap();
        assert_eq!(failed["result"], "failed");
        assert_eq!(failed["reason"], "denied");
        assert!(!LiveFeedProbe::Standalone.is_available());
    }
}
