//! Entity store boundary.
//!
//! Defines what the automation engine needs from a store (topology probe,
//! live change feed, lifecycle hooks, repositories) and ships an in-memory
//! implementation of all of it.

mod hooks;
mod memory_store;
mod repositories;
mod store_model;
mod store_traits;

pub use hooks::HookRegistry;
pub use memory_store::InMemoryStore;
pub use repositories::PipelineRepositories;
pub use store_model::*;
pub use store_traits::*;
