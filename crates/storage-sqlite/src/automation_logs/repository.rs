use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use salesflow_core::audit::{
    AutomationLogEntry, AutomationLogRepositoryTrait, NewAutomationLogEntry,
};
use salesflow_core::Result;
use std::sync::Arc;

use super::model::AutomationLogDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::automation_logs;

/// Append-only audit log. Entries are never updated or deleted.
pub struct AutomationLogRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl AutomationLogRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl AutomationLogRepositoryTrait for AutomationLogRepository {
    async fn insert(&self, entry: NewAutomationLogEntry) -> Result<AutomationLogEntry> {
        entry.validate()?;
        let row = AutomationLogDB::from_new(entry)?;
        self.writer
            .exec(
                move |conn: &mut SqliteConnection| -> Result<AutomationLogEntry> {
                    let inserted = diesel::insert_into(automation_logs::table)
                        .values(&row)
                        .returning(AutomationLogDB::as_returning())
                        .get_result(conn)
                        .map_err(StorageError::from)?;
                    AutomationLogEntry::try_from(inserted)
                },
            )
            .await
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<AutomationLogEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        automation_logs::table
            .select(AutomationLogDB::as_select())
            .order((automation_logs::created_at.desc(), automation_logs::id.desc()))
            .limit(limit)
            .load::<AutomationLogDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(AutomationLogEntry::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStore;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_entries_come_back_newest_first_with_details() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("pipeline.db").to_str().unwrap()).unwrap();

        for i in 0..5 {
            store
                .automation_logs
                .insert(
                    NewAutomationLogEntry::new("Lead→Opportunity", "leads", format!("lead-{}", i))
                        .with_target("opportunities", format!("opp-{}", i))
                        .with_details(json!({ "seq": i })),
                )
                .await
                .unwrap();
        }

        let recent = store.automation_logs.list_recent(3).unwrap();
        let sources: Vec<&str> = recent.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(sources, vec!["lead-4", "lead-3", "lead-2"]);
        assert_eq!(recent[0].details, Some(json!({ "seq": 4 })));
        assert_eq!(recent[0].target_id.as_deref(), Some("opp-4"));
    }

    #[tokio::test]
    async fn test_invalid_entry_is_rejected_before_write() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("pipeline.db").to_str().unwrap()).unwrap();

        let err = store
            .automation_logs
            .insert(NewAutomationLogEntry::new("", "leads", "lead-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, salesflow_core::Error::Validation(_)));
        assert!(store.automation_logs.list_recent(10).unwrap().is_empty());
    }
}
