//! Order domain models.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contacts::ContactDetails;
use crate::errors::ValidationError;
use crate::utils::status::define_status;
use crate::{Error, Result};

define_status! {
    /// Fulfilment status of an order.
    OrderStatus("order status") {
        #[default]
        Active => "Active",
        Completed => "Completed",
        Cancelled => "Cancelled",
    }
}

impl OrderStatus {
    /// Returns true for statuses that close out the owning opportunity.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Domain model representing a customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub quote_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub lead_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input model for creating a new order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    pub quote_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub lead_id: Option<String>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Order name cannot be empty".to_string(),
            )));
        }
        if self.amount.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Order amount cannot be negative".to_string(),
            )));
        }
        Ok(())
    }
}

/// Input model for updating an existing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactDetails,
    pub amount: Decimal,
    pub status: OrderStatus,
}

impl OrderUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "id".to_string(),
            )));
        }
        if self.amount.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Order amount cannot be negative".to_string(),
            )));
        }
        Ok(())
    }
}
