//! SQLite storage implementation for leads.

mod model;
mod repository;

pub use model::{LeadChangesDB, LeadDB};
pub use repository::LeadRepository;
