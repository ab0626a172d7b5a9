//! Database models for automation audit entries.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use salesflow_core::audit::{AutomationLogEntry, NewAutomationLogEntry};
use salesflow_core::{Error, Result};
use uuid::Uuid;

use crate::utils::now;

/// Database model for automation audit entries
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::automation_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AutomationLogDB {
    pub id: String,
    pub action: String,
    pub source_collection: String,
    pub source_id: String,
    pub target_collection: Option<String>,
    pub target_id: Option<String>,
    /// JSON object, stored as text
    pub details: Option<String>,
    pub created_at: NaiveDateTime,
}

impl AutomationLogDB {
    /// Builds the row for a new entry. Ids are UUIDv7 so that entries
    /// written in the same instant still sort in insertion order.
    pub fn from_new(entry: NewAutomationLogEntry) -> Result<Self> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        Ok(Self {
            id: Uuid::now_v7().to_string(),
            action: entry.action,
            source_collection: entry.source_collection,
            source_id: entry.source_id,
            target_collection: entry.target_collection,
            target_id: entry.target_id,
            details,
            created_at: now(),
        })
    }
}

impl TryFrom<AutomationLogDB> for AutomationLogEntry {
    type Error = Error;

    fn try_from(db: AutomationLogDB) -> Result<Self> {
        Ok(Self {
            id: db.id,
            action: db.action,
            source_collection: db.source_collection,
            source_id: db.source_id,
            target_collection: db.target_collection,
            target_id: db.target_id,
            details: db
                .details
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?,
            created_at: db.created_at,
        })
    }
}
