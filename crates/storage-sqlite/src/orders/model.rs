//! Database models for orders.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use salesflow_core::contacts::ContactDetails;
use salesflow_core::orders::{NewOrder, Order, OrderUpdate};
use salesflow_core::{Error, Result};

use crate::utils::{decimal_from_text, decimal_to_text, new_id, now};

/// Database model for orders
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderDB {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub amount: String,
    pub status: String,
    pub quote_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub lead_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(treat_none_as_null = true)]
pub struct OrderChangesDB {
    pub name: String,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub amount: String,
    pub status: String,
    pub updated_at: NaiveDateTime,
}

impl From<NewOrder> for OrderDB {
    fn from(domain: NewOrder) -> Self {
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
            quote_id: domain.quote_id,
            opportunity_id: domain.opportunity_id,
            lead_id: domain.lead_id,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

impl From<OrderUpdate> for OrderChangesDB {
    fn from(domain: OrderUpdate) -> Self {
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

impl TryFrom<OrderDB> for Order {
    type Error = Error;

    fn try_from(db: OrderDB) -> Result<Self> {
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
            quote_id: db.quote_id,
            opportunity_id: db.opportunity_id,
            lead_id: db.lead_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
