//! Opportunity domain models.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contacts::{set_once, ContactDetails};
use crate::errors::ValidationError;
use crate::utils::status::define_status;
use crate::{Error, Result};

define_status! {
    /// Sales phase an opportunity is in.
    SalesPhase("sales phase") {
        #[default]
        Qualification => "qualification",
        NeedsAnalysis => "needs analysis",
        Proposal => "proposal",
        Quotation => "quotation",
        Negotiation => "negotiation",
    }
}

define_status! {
    /// Commercial outcome of an opportunity.
    OpportunityStatus("opportunity status") {
        #[default]
        Open => "Open",
        Won => "Won",
        Lost => "Lost",
        ClosedWon => "Closed Won",
    }
}

/// Domain model representing an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub sales_phase: SalesPhase,
    pub status: OpportunityStatus,
    pub expected_value: Decimal,
    /// Origin lead, if the opportunity came out of qualification
    pub lead_id: Option<String>,
    pub linked_quote_id: Option<String>,
    pub linked_order_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new opportunity.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewOpportunity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    #[serde(default)]
    pub sales_phase: SalesPhase,
    #[serde(default)]
    pub status: OpportunityStatus,
    #[serde(default)]
    pub expected_value: Decimal,
    pub lead_id: Option<String>,
}

impl NewOpportunity {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Opportunity name cannot be empty".to_string(),
            )));
        }
        if self.expected_value.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Expected value cannot be negative".to_string(),
            )));
        }
        Ok(())
    }
}

/// Input model for updating an existing opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityUpdate {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub sales_phase: SalesPhase,
    pub status: OpportunityStatus,
    pub expected_value: Decimal,
}

impl OpportunityUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "id".to_string(),
            )));
        }
        if self.expected_value.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Expected value cannot be negative".to_string(),
            )));
        }
        Ok(())
    }
}

/// Link fields the engine may write back onto an opportunity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpportunityLinks {
    pub linked_quote_id: Option<String>,
    pub linked_order_id: Option<String>,
}

impl OpportunityLinks {
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

    /// Applies the links with set-if-unset semantics.
    pub fn apply_to(&self, opportunity: &mut Opportunity) -> bool {
        let a = set_once(
            &mut opportunity.linked_quote_id,
            self.linked_quote_id.as_ref(),
        );
        let b = set_once(
            &mut opportunity.linked_order_id,
            self.linked_order_id.as_ref(),
        );
        a || b
    }
}
