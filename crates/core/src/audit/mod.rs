//! Automation audit log.

mod audit_logger;
mod audit_model;
mod audit_traits;

pub use audit_logger::AuditLogger;
pub use audit_model::{AutomationLogEntry, NewAutomationLogEntry};
pub use audit_traits::AutomationLogRepositoryTrait;
