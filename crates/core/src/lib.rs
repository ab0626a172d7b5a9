//! Salesflow Core - Pipeline entities, services, and the cascade automation engine.
//!
//! This crate contains the pipeline domain and the automation engine that
//! advances leads through opportunities, quotes and orders. It is
//! database-agnostic: it defines the store traits that the `storage-sqlite`
//! crate implements and ships an in-memory store of its own.

pub mod audit;
pub mod automation;
pub mod constants;
pub mod contacts;
pub mod errors;
pub mod events;
pub mod leads;
pub mod opportunities;
pub mod orders;
pub mod quotes;
pub mod store;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
