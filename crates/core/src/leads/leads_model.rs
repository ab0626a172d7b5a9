//! Lead domain models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::contacts::{set_once, ContactDetails};
use crate::errors::ValidationError;
use crate::utils::status::define_status;
use crate::{Error, Result};

define_status! {
    /// Qualification status of a lead.
    LeadStatus("lead status") {
        #[default]
        New => "New",
        Contacted => "Contacted",
        InProcess => "In process",
        Qualified => "Qualified",
        Disqualified => "Disqualified",
    }
}

/// Domain model representing a lead in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub status: LeadStatus,
    /// Opportunity created from this lead (set by the engine, never cleared)
    pub linked_opportunity_id: Option<String>,
    pub linked_quote_id: Option<String>,
    pub linked_order_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new lead.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    #[serde(default)]
    pub status: LeadStatus,
}

impl NewLead {
    /// Validates the new lead data.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Lead name cannot be empty".to_string(),
            )));
        }
        Ok(())
    }
}

/// Input model for updating an existing lead.
///
/// Link fields are absent: only the engine writes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub status: LeadStatus,
}

impl LeadUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "id".to_string(),
            )));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Lead name cannot be empty".to_string(),
            )));
        }
        Ok(())
    }
}

/// Link fields the engine may write back onto a lead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadLinks {
    pub linked_opportunity_id: Option<String>,
    pub linked_quote_id: Option<String>,
    pub linked_order_id: Option<String>,
}

impl LeadLinks {
    pub fn opportunity(id: impl Into<String>) -> Self {
        Self {
            linked_opportunity_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn quote(id: impl Into<String>) -> Self {
        Self {
            linked_quote_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn order(id: impl Into<String>) -> Self {
        Self {
            linked_order_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Applies the links with set-if-unset semantics. Returns true if any
    /// field changed.
    pub fn apply_to(&self, lead: &mut Lead) -> bool {
        let a = set_once(
            &mut lead.linked_opportunity_id,
            self.linked_opportunity_id.as_ref(),
        );
        let b = set_once(&mut lead.linked_quote_id, self.linked_quote_id.as_ref());
        let c = set_once(&mut lead.linked_order_id, self.linked_order_id.as_ref());
        a || b || c
    }
}
