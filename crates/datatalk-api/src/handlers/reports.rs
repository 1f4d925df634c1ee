use axum::extract::{Path, Query, State};
use axum::Json;
use datatalk_core::CoreError;
use datatalk_registry::persistence::Report;
use std::collections::HashMap;

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let mut reports = state.registry.list_reports().map_err(CoreError::from)?;
    if let Some(dataset_id) = params.get("datasetId") {
        reports.retain(|report| &report.dataset_id == dataset_id);
    }
    Ok(Json(reports))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    Ok(Json(state.registry.get_report(&report_id).map_err(CoreError::from)?))
}
