//! SQLite storage implementation for quotes.

mod model;
mod repository;

pub use model::{QuoteChangesDB, QuoteDB};
pub use repository::QuoteRepository;
