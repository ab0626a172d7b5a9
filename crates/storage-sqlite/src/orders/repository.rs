use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;
use salesflow_core::orders::{NewOrder, Order, OrderRepositoryTrait, OrderUpdate};
use salesflow_core::store::{Collection, HookRegistry, PipelineDocument};
use salesflow_core::Result;
use std::sync::Arc;

use super::model::{OrderChangesDB, OrderDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::orders;
use crate::utils::{fire_created, fire_updated, not_found};

pub struct OrderRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    hooks: Arc<HookRegistry>,
}

impl OrderRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, hooks: Arc<HookRegistry>) -> Self {
        Self {
            pool,
            writer,
            hooks,
        }
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn create(&self, new_order: NewOrder) -> Result<Order> {
        let order = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Order> {
                let row = OrderDB::from(new_order);
                let inserted = diesel::insert_into(orders::table)
                    .values(&row)
                    .returning(OrderDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Order::try_from(inserted)
            })
            .await?;
        fire_created(&self.hooks, Collection::Orders, PipelineDocument::Order(order.clone()));
        Ok(order)
    }

    async fn update(&self, order_update: OrderUpdate) -> Result<Order> {
        let order = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Order> {
                let order_id = order_update.id.clone();
                let changes = OrderChangesDB::from(order_update);
                let updated = diesel::update(orders::table.find(&order_id))
                    .set(&changes)
                    .returning(OrderDB::as_returning())
                    .get_result(conn)
                    .optional()
                    .map_err(StorageError::from)?
                    .ok_or_else(|| not_found("Order", &order_id))?;
                Order::try_from(updated)
            })
            .await?;
        fire_updated(&self.hooks, Collection::Orders, &order.id);
        Ok(order)
    }

    fn find_by_id(&self, order_id: &str) -> Result<Option<Order>> {
        let mut conn = get_connection(&self.pool)?;
        orders::table
            .find(order_id)
            .select(OrderDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(Order::try_from)
            .transpose()
    }

    fn find_by_quote_id(&self, quote_id: &str) -> Result<Option<Order>> {
        let mut conn = get_connection(&self.pool)?;
        orders::table
            .filter(orders::quote_id.eq(quote_id))
            .select(OrderDB::as_select())
            .first(&mut conn)
            .optional()
            .map_err(StorageError::from)?
            .map(Order::try_from)
            .transpose()
    }

    fn list(&self) -> Result<Vec<Order>> {
        let mut conn = get_connection(&self.pool)?;
        orders::table
            .select(OrderDB::as_select())
            .order((orders::created_at.asc(), orders::id.asc()))
            .load::<OrderDB>(&mut conn)
            .map_err(StorageError::from)?
            .into_iter()
            .map(Order::try_from)
            .collect()
    }
}
