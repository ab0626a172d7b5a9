//! SQLite storage implementation for orders.

mod model;
mod repository;

pub use model::{OrderChangesDB, OrderDB};
pub use repository::OrderRepository;
