use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use salesflow_core::audit::AutomationLogEntry;
use salesflow_core::automation::AutomationStatus;
use salesflow_core::constants::DEFAULT_AUDIT_PAGE_SIZE;
use serde::Deserialize;

const MAX_AUDIT_PAGE_SIZE: usize = 1000;

#[derive(Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

/// Audit entries, newest first.
async fn list_automation_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<Vec<AutomationLogEntry>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_PAGE_SIZE)
        .min(MAX_AUDIT_PAGE_SIZE);
    let entries = state.automation.recent_logs(limit)?;
    Ok(Json(entries))
}

async fn get_automation_status(State(state): State<Arc<AppState>>) -> Json<AutomationStatus> {
    Json(state.automation.status())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/automation/logs", get(list_automation_logs))
        .route("/automation/status", get(get_automation_status))
}
