use log::debug;
use std::sync::Arc;

use super::orders_model::{NewOrder, Order, OrderUpdate};
use super::orders_traits::{OrderRepositoryTrait, OrderServiceTrait};
use crate::automation::CascadeTrigger;
use crate::errors::{DatabaseError, Error, Result};
use crate::store::PipelineDocument;

/// Service for managing orders.
pub struct OrderService {
    repository: Arc<dyn OrderRepositoryTrait>,
    cascade: Arc<dyn CascadeTrigger>,
}

impl OrderService {
    pub fn new(repository: Arc<dyn OrderRepositoryTrait>, cascade: Arc<dyn CascadeTrigger>) -> Self {
        Self {
            repository,
            cascade,
        }
    }

    async fn cascade_if_qualifying(&self, order: &Order) {
        let document = PipelineDocument::Order(order.clone());
        if document.meets_cascade_precondition() {
            debug!("Order {} is {}, invoking cascade directly", order.id, order.status);
            self.cascade.trigger(document).await;
        }
    }
}

#[async_trait::async_trait]
impl OrderServiceTrait for OrderService {
    async fn create_order(&self, new_order: NewOrder) -> Result<Order> {
        new_order.validate()?;
        let order = self.repository.create(new_order).await?;
        self.cascade_if_qualifying(&order).await;
        Ok(order)
    }

    async fn update_order(&self, order_update: OrderUpdate) -> Result<Order> {
        order_update.validate()?;
        let order = self.repository.update(order_update).await?;
        self.cascade_if_qualifying(&order).await;
        Ok(order)
    }

    fn get_order(&self, order_id: &str) -> Result<Order> {
        self.repository.find_by_id(order_id)?.ok_or_else(|| {
            Error::Database(DatabaseError::NotFound(format!("Order {}", order_id)))
        })
    }

    fn list_orders(&self) -> Result<Vec<Order>> {
        self.repository.list()
    }
}
