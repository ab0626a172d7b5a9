//! Database models for opportunities.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use salesflow_core::contacts::ContactDetails;
use salesflow_core::opportunities::{NewOpportunity, Opportunity, OpportunityUpdate};
use salesflow_core::{Error, Result};

use crate::utils::{decimal_from_text, decimal_to_text, new_id, now};

/// Database model for opportunities
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::opportunities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OpportunityDB {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sales_phase: String,
    pub status: String,
    pub expected_value: String,
    pub lead_id: Option<String>,
    pub linked_quote_id: Option<String>,
    pub linked_order_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::opportunities)]
#[diesel(treat_none_as_null = true)]
pub struct OpportunityChangesDB {
    pub name: String,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sales_phase: String,
    pub status: String,
    pub expected_value: String,
    pub updated_at: NaiveDateTime,
}

/// Columns the engine writes: status and link fields.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::opportunities)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct OpportunityEngineDB {
    pub status: String,
    pub linked_quote_id: Option<String>,
    pub linked_order_id: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl From<NewOpportunity> for OpportunityDB {
    fn from(domain: NewOpportunity) -> Self {
        let timestamp = now();
        Self {
            id: new_id(domain.id),
            name: domain.name,
            company: domain.contact.company,
            contact_name: domain.contact.contact_name,
            email: domain.contact.email,
            phone: domain.contact.phone,
            sales_phase: domain.sales_phase.to_string(),
            status: domain.status.to_string(),
            expected_value: decimal_to_text(domain.expected_value),
            lead_id: domain.lead_id,
            linked_quote_id: None,
            linked_order_id: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

impl From<OpportunityUpdate> for OpportunityChangesDB {
    fn from(domain: OpportunityUpdate) -> Self {
        Self {
            name: domain.name,
            company: domain.contact.company,
            contact_name: domain.contact.contact_name,
            email: domain.contact.email,
            phone: domain.contact.phone,
            sales_phase: domain.sales_phase.to_string(),
            status: domain.status.to_string(),
            expected_value: decimal_to_text(domain.expected_value),
            updated_at: now(),
        }
    }
}

impl From<&Opportunity> for OpportunityEngineDB {
    fn from(opportunity: &Opportunity) -> Self {
        Self {
            status: opportunity.status.to_string(),
            linked_quote_id: opportunity.linked_quote_id.clone(),
            linked_order_id: opportunity.linked_order_id.clone(),
            updated_at: opportunity.updated_at,
        }
    }
}

impl TryFrom<OpportunityDB> for Opportunity {
    type Error = Error;

    fn try_from(db: OpportunityDB) -> Result<Self> {
        Ok(Self {
            id: db.id,
            name: db.name,
            contact: ContactDetails {
                company: db.company,
                contact_name: db.contact_name,
                email: db.email,
                phone: db.phone,
            },
            sales_phase: db.sales_phase.parse()?,
            status: db.status.parse()?,
            expected_value: decimal_from_text(&db.expected_value)?,
            lead_id: db.lead_id,
            linked_quote_id: db.linked_quote_id,
            linked_order_id: db.linked_order_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
