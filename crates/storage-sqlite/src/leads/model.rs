//! Database models for leads.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use salesflow_core::contacts::ContactDetails;
use salesflow_core::leads::{Lead, LeadUpdate, NewLead};
use salesflow_core::{Error, Result};

use crate::utils::{new_id, now};

/// Database model for leads
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::leads)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LeadDB {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub linked_opportunity_id: Option<String>,
    pub linked_quote_id: Option<String>,
    pub linked_order_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// User-editable lead columns. Link columns are written separately.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::leads)]
#[diesel(treat_none_as_null = true)]
pub struct LeadChangesDB {
    pub name: String,
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub updated_at: NaiveDateTime,
}

/// Engine-owned link columns.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::leads)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct LeadLinksDB {
    pub linked_opportunity_id: Option<String>,
    pub linked_quote_id: Option<String>,
    pub linked_order_id: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl From<NewLead> for LeadDB {
    fn from(domain: NewLead) -> Self {
        let timestamp = now();
        Self {
            id: new_id(domain.id),
            name: domain.name,
            company: domain.contact.company,
            contact_name: domain.contact.contact_name,
            email: domain.contact.email,
            phone: domain.contact.phone,
            status: domain.status.to_string(),
            linked_opportunity_id: None,
            linked_quote_id: None,
            linked_order_id: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}

impl From<LeadUpdate> for LeadChangesDB {
    fn from(domain: LeadUpdate) -> Self {
        Self {
            name: domain.name,
            company: domain.contact.company,
            contact_name: domain.contact.contact_name,
            email: domain.contact.email,
            phone: domain.contact.phone,
            status: domain.status.to_string(),
            updated_at: now(),
        }
    }
}

impl From<&Lead> for LeadLinksDB {
    fn from(lead: &Lead) -> Self {
        Self {
            linked_opportunity_id: lead.linked_opportunity_id.clone(),
            linked_quote_id: lead.linked_quote_id.clone(),
            linked_order_id: lead.linked_order_id.clone(),
            updated_at: lead.updated_at,
        }
    }
}

// An unknown status label fails the load.
impl TryFrom<LeadDB> for Lead {
    type Error = Error;

    fn try_from(db: LeadDB) -> Result<Self> {
        Ok(Self {
            id: db.id,
            name: db.name,
            contact: ContactDetails {
                company: db.company,
                contact_name: db.contact_name,
                email: db.email,
                phone: db.phone,
            },
            status: db.status.parse()?,
            linked_opportunity_id: db.linked_opportunity_id,
            linked_quote_id: db.linked_quote_id,
            linked_order_id: db.linked_order_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}
