//! Database models for quotes.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use salesflow_core::contacts::ContactDetails;
use salesflow_core::quotes::{NewQuote, Quote, QuoteUpdate};
use salesflow_core::{Error, Result};

use crate::utils::{decimal_from_text, decimal_to_text, new_id, now};

/// Database model for quotes
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::quotes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QuoteDB {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub amount: String,
    pub status: String,
    pub opportunity_id: Option<String>,
    pub lead_id: Option<String>,
    pub linked_order_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::quotes)]
#[diesel(treat_none_as_null = true)]
pub struct QuoteChangesDB {
    pub name: String,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub amount: String,
    pub status: String,
    pub updated_at: NaiveDateTime,
}

impl From<NewQuote> for QuoteDB {
    fn from(domain: NewQuote) -> Self {
        let timestamp = now();
        Self {
            id: new_id(domain.id),
            name: domain.name,
            company: domain.contact.company,
            contact_name: domain.contact.contact_name,
            email: domain.contact.email,
            phone: domain.contact.phone,
            amount: decimal_to_text(domain.amount),
            status: domain.status.to_string(),
            opportunity_id: domain.opportunity_id,
            lead_id: domain.lead_id,
            linked_order_id: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

impl From<QuoteUpdate> for QuoteChangesDB {
    fn from(domain: QuoteUpdate) -> Self {
        Self {
            name: domain.name,
            company: domain.contact.company,
            contact_name: domain.contact.contact_name,
            email: domain.contact.email,
            phone: domain.contact.phone,
            amount: decimal_to_text(domain.amount),
            status: domain.status.to_string(),
            updated_at: now(),
        }
    }
}

impl TryFrom<QuoteDB> for Quote {
    type Error = Error;

    fn try_from(db: QuoteDB) -> Result<Self> {
        Ok(Self {
            id: db.id,
            name: db.name,
            contact: ContactDetails {
                company: db.company,
                contact_name: db.contact_name,
                email: db.email,
                phone: db.phone,
            },
            amount: decimal_from_text(&db.amount)?,
            status: db.status.parse()?,
            opportunity_id: db.opportunity_id,
            lead_id: db.lead_id,
            linked_order_id: db.linked_order_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
