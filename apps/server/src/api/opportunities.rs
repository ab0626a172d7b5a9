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
use salesflow_core::opportunities::{NewOpportunity, Opportunity, OpportunityUpdate};

async fn list_opportunities(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Opportunity>>> {
    let opportunities = state.opportunity_service.list_opportunities()?;
    Ok(Json(opportunities))
}

async fn get_opportunity(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Opportunity>> {
    let opportunity = state.opportunity_service.get_opportunity(&id)?;
    Ok(Json(opportunity))
}

async fn create_opportunity(
    State(state): State<Arc<AppState>>,
    Json(opportunity): Json<NewOpportunity>,
) -> ApiResult<Json<Opportunity>> {
    let created = state.opportunity_service.create_opportunity(opportunity).await?;
    Ok(Json(created))
}

async fn update_opportunity(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(mut opportunity): Json<OpportunityUpdate>,
) -> ApiResult<Json<Opportunity>> {
    if opportunity.id.is_empty() {
        opportunity.id = id;
    } else if opportunity.id != id {
        return Err(ApiError::BadRequest(format!(
            "Body id '{}' does not match path id '{}'",
            opportunity.id, id
        )));
    }
    let updated = state.opportunity_service.update_opportunity(opportunity).await?;
    Ok(Json(updated))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/opportunities", get(list_opportunities).post(create_opportunity))
        .route("/opportunities/{id}", get(get_opportunity).put(update_opportunity))
}
