//! SQLite storage implementation for Salesflow.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `salesflow-core` and contains:
//! - Database connection pooling and the single-writer actor
//! - Diesel migrations, including the unique origin-link indexes
//! - Repository implementations for every pipeline entity and the audit log
//! - Post-commit lifecycle hooks, the trigger source the engine uses here
//!
//! SQLite has no change feed, so the store reports a standalone topology.
//!
//! ```text
//!      core (domain + engine)
//!              │
//!              ▼
//!     storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```

pub mod admin;
pub mod automation_logs;
pub mod db;
pub mod errors;
pub mod leads;
pub mod opportunities;
pub mod orders;
pub mod quotes;
pub mod schema;
pub mod store;
mod utils;

pub use admin::SqliteStoreAdmin;
pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool, WriteHandle};
pub use errors::{IntoCore, StorageError};
pub use store::SqliteStore;

pub use salesflow_core::errors::{DatabaseError, Error, Result};
