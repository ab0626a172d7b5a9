use std::sync::Arc;

use super::audit_model::{AutomationLogEntry, NewAutomationLogEntry};
use super::audit_traits::AutomationLogRepositoryTrait;
use crate::errors::Result;

/// Appends automation audit entries.
///
/// `record` reports failures to its caller, but callers inside the engine
/// treat the result as advisory: an audit failure never aborts a cascade.
#[derive(Clone)]
pub struct AuditLogger {
    repository: Arc<dyn AutomationLogRepositoryTrait>,
}

impl AuditLogger {
    pub fn new(repository: Arc<dyn AutomationLogRepositoryTrait>) -> Self {
        Self { repository }
    }

    pub async fn record(&self, entry: NewAutomationLogEntry) -> Result<AutomationLogEntry> {
        entry.validate()?;
        self.repository.insert(entry).await
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<AutomationLogEntry>> {
        self.repository.list_recent(limit)
    }
}
