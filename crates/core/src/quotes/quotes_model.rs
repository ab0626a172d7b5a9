//! Quote domain models.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contacts::{set_once, ContactDetails};
use crate::errors::ValidationError;
use crate::utils::status::define_status;
use crate::{Error, Result};

define_status! {
    /// Customer decision on a quote.
    QuoteStatus("quote status") {
        #[default]
        Open => "Open",
        Sent => "Sent",
        Order => "Order",
        NoOrder => "No Order",
    }
}

/// Domain model representing a quote sent to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub amount: Decimal,
    pub status: QuoteStatus,
    pub opportunity_id: Option<String>,
    pub lead_id: Option<String>,
    pub linked_order_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new quote.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewQuote {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub status: QuoteStatus,
    pub opportunity_id: Option<String>,
    pub lead_id: Option<String>,
}

impl NewQuote {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Quote name cannot be empty".to_string(),
            )));
        }
        if self.amount.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Quote amount cannot be negative".to_string(),
            )));
        }
        Ok(())
    }
}

/// Input model for updating an existing quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteUpdate {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub amount: Decimal,
    pub status: QuoteStatus,
}

impl QuoteUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "id".to_string(),
            )));
        }
        if self.amount.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Quote amount cannot be negative".to_string(),
            )));
        }
        Ok(())
    }
}

/// Link fields the engine may write back onto a quote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteLinks {
    pub linked_order_id: Option<String>,
}

impl QuoteLinks {
    pub fn order(id: impl Into<String>) -> Self {
        Self {
            linked_order_id: Some(id.into()),
        }
    }

    pub fn apply_to(&self, quote: &mut Quote) -> bool {
        set_once(&mut quote.linked_order_id, self.linked_order_id.as_ref())
    }
}
