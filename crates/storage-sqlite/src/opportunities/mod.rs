//! SQLite storage implementation for opportunities.

mod model;
mod repository;

pub use model::{OpportunityChangesDB, OpportunityDB};
pub use repository::OpportunityRepository;
