//! Automation audit log models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ValidationError;
use crate::{Error, Result};

/// Immutable record describing one automation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationLogEntry {
    pub id: String,
    /// Transition tag, e.g. "Lead→Opportunity"
    pub action: String,
    pub source_collection: String,
    pub source_id: String,
    pub target_collection: Option<String>,
    pub target_id: Option<String>,
    pub details: Option<Value>,
    pub created_at: NaiveDateTime,
}

/// Input model for appending an audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAutomationLogEntry {
    pub action: String,
    pub source_collection: String,
    pub source_id: String,
    pub target_collection: Option<String>,
    pub target_id: Option<String>,
    pub details: Option<Value>,
}

impl NewAutomationLogEntry {
    pub fn new(
        action: impl Into<String>,
        source_collection: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            source_collection: source_collection.into(),
            source_id: source_id.into(),
            target_collection: None,
            target_id: None,
            details: None,
        }
    }

    pub fn with_target(
        mut self,
        target_collection: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        self.target_collection = Some(target_collection.into());
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Validates the entry before it is written.
    pub fn validate(&self) -> Result<()> {
        if self.action.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "action".to_string(),
            )));
        }
        if self.source_collection.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "sourceCollection".to_string(),
            )));
        }
        if self.target_collection.is_some() != self.target_id.is_some() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "targetCollection and targetId must be set together".to_string(),
            )));
        }
        if let Some(details) = &self.details {
            if !details.is_object() {
                return Err(Error::Validation(ValidationError::InvalidInput(
                    "details must be a JSON object".to_string(),
                )));
            }
        }
        Ok(())
    }
}
