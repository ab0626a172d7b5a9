//! Orders module - domain models, services, and traits.

mod orders_model;
mod orders_service;
mod orders_traits;

pub use orders_model::{NewOrder, Order, OrderStatus, OrderUpdate};
pub use orders_service::OrderService;
pub use orders_traits::{OrderRepositoryTrait, OrderServiceTrait};
