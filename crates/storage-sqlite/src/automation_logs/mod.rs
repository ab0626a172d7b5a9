//! SQLite storage implementation for the automation audit log.

mod model;
mod repository;

pub use model::AutomationLogDB;
pub use repository::AutomationLogRepository;
