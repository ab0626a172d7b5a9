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
use salesflow_core::leads::{Lead, LeadUpdate, NewLead};

async fn list_leads(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Lead>>> {
    let leads = state.lead_service.list_leads()?;
    Ok(Json(leads))
}

async fn get_lead(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Lead>> {
    let lead = state.lead_service.get_lead(&id)?;
    Ok(Json(lead))
}

async fn create_lead(
    State(state): State<Arc<AppState>>,
    Json(lead): Json<NewLead>,
) -> ApiResult<Json<Lead>> {
    let created = state.lead_service.create_lead(lead).await?;
    Ok(Json(created))
}

async fn update_lead(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(mut lead): Json<LeadUpdate>,
) -> ApiResult<Json<Lead>> {
    if lead.id.is_empty() {
        lead.id = id;
    } else if lead.id != id {
        return Err(ApiError::BadRequest(format!(
            "Body id '{}' does not match path id '{}'",
            lead.id, id
        )));
    }
    let updated = state.lead_service.update_lead(lead).await?;
    Ok(Json(updated))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/leads", get(list_leads).post(create_lead))
        .route("/leads/{id}", get(get_lead).put(update_lead))
}
