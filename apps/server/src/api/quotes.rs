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
use salesflow_core::quotes::{NewQuote, Quote, QuoteUpdate};

async fn list_quotes(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Quote>>> {
    let quotes = state.quote_service.list_quotes()?;
    Ok(Json(quotes))
}

async fn get_quote(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Quote>> {
    let quote = state.quote_service.get_quote(&id)?;
    Ok(Json(quote))
}

async fn create_quote(
    State(state): State<Arc<AppState>>,
    Json(quote): Json<NewQuote>,
) -> ApiResult<Json<Quote>> {
    let created = state.quote_service.create_quote(quote).await?;
    Ok(Json(created))
}

async fn update_quote(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(mut quote): Json<QuoteUpdate>,
) -> ApiResult<Json<Quote>> {
    if quote.id.is_empty() {
        quote.id = id;
    } else if quote.id != id {
        return Err(ApiError::BadRequest(format!(
            "Body id '{}' does not match path id '{}'",
            quote.id, id
        )));
    }
    let updated = state.quote_service.update_quote(quote).await?;
    Ok(Json(updated))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quotes", get(list_quotes).post(create_quote))
        .route("/quotes/{id}", get(get_quote).put(update_quote))
}
