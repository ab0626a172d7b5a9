//! Order repository and service traits.

use async_trait::async_trait;

use super::orders_model::{NewOrder, Order, OrderUpdate};
use crate::errors::Result;

/// Trait defining the contract for Order repository operations.
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// Creates a new order.
    ///
    /// Fails with `DatabaseError::UniqueViolation` if another order already
    /// references the same origin quote.
    async fn create(&self, new_order: NewOrder) -> Result<Order>;

    async fn update(&self, order_update: OrderUpdate) -> Result<Order>;

    fn find_by_id(&self, order_id: &str) -> Result<Option<Order>>;

    fn find_by_quote_id(&self, quote_id: &str) -> Result<Option<Order>>;

    fn list(&self) -> Result<Vec<Order>>;
}

/// Trait defining the contract for Order service operations.
#[async_trait]
pub trait OrderServiceTrait: Send + Sync {
    async fn create_order(&self, new_order: NewOrder) -> Result<Order>;

    async fn update_order(&self, order_update: OrderUpdate) -> Result<Order>;

    fn get_order(&self, order_id: &str) -> Result<Order>;

    fn list_orders(&self) -> Result<Vec<Order>>;
}
