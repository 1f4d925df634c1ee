use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use datatalk_core::{CoreError, PlannedQuery, ResultTable};
use serde::Deserialize;

use super::resolve_flag;
use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(rename = "datasetId")]
    dataset_id: String,
    queries: Vec<PlannedQuery>,
    #[serde(rename = "safeMode")]
    safe_mode: Option<bool>,
}

/// Bypasses the planner for client-authored queries; uses the wider
/// `L_max` row ceiling rather than the planner path's `L_exec`.
pub async fn execute_queries(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ExecuteRequest>,
) -> Result<Json<Vec<ResultTable>>, ApiError> {
    let safe_mode = resolve_flag(body.safe_mode, &headers, "x-safe-mode", false);

    let dataset = state
        .registry
        .get_dataset(&body.dataset_id)
        .map_err(CoreError::from)?;

    let results = state
        .executor
        .execute(&dataset, &body.queries, safe_mode, datatalk_executor::L_MAX)
        .await
        .map_err(CoreError::from)?;

    Ok(Json(results))
}
