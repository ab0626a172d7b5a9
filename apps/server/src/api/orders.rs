use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use salesflow_core::orders::{NewOrder, Order, OrderUpdate};

async fn list_orders(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Order>>> {
    let orders = state.order_service.list_orders()?;
    Ok(Json(orders))
}

async fn get_order(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Order>> {
    let order = state.order_service.get_order(&id)?;
    Ok(Json(order))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(order): Json<NewOrder>,
) -> ApiResult<Json<Order>> {
    let created = state.order_service.create_order(order).await?;
    Ok(Json(created))
}

async fn update_order(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(mut order): Json<OrderUpdate>,
) -> ApiResult<Json<Order>> {
    if order.id.is_empty() {
        order.id = id;
    } else if order.id != id {
        return Err(ApiError::BadRequest(format!(
            "Body id '{}' does not match path id '{}'",
            order.id, id
        )));
    }
    let updated = state.order_service.update_order(order).await?;
    Ok(Json(updated))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order).put(update_order))
}
