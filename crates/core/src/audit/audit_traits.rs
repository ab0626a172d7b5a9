use async_trait::async_trait;

use super::audit_model::{AutomationLogEntry, NewAutomationLogEntry};
use crate::errors::Result;

/// Append-only persistence for automation audit entries.
#[async_trait]
pub trait AutomationLogRepositoryTrait: Send + Sync {
    async fn insert(&self, entry: NewAutomationLogEntry) -> Result<AutomationLogEntry>;

    /// Returns at most `limit` entries, newest first.
    fn list_recent(&self, limit: usize) -> Result<Vec<AutomationLogEntry>>;
}
