use axum::extract::{Path, State};
use axum::Json;
use datatalk_core::{Catalog, CoreError, Dataset, SourceType};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterDatasetRequest {
    name: String,
    #[serde(rename = "filePath")]
    file_path: String,
    #[serde(rename = "sourceType")]
    source_type: Option<SourceType>,
}

#[derive(Debug, Serialize)]
pub struct RegisterDatasetResponse {
    #[serde(rename = "datasetId")]
    dataset_id: String,
    status: datatalk_core::DatasetStatus,
}

pub async fn register_dataset(
    State(state): State<AppState>,
    Json(body): Json<RegisterDatasetRequest>,
) -> Result<Json<RegisterDatasetResponse>, ApiError> {
    let dataset = state
        .registry
        .register(&body.name, &body.file_path, body.source_type)
        .await
        .map_err(CoreError::from)?;
    Ok(Json(RegisterDatasetResponse {
        dataset_id: dataset.id,
        status: dataset.status,
    }))
}

pub async fn list_datasets(State(state): State<AppState>) -> Result<Json<Vec<Dataset>>, ApiError> {
    Ok(Json(state.registry.list_datasets().map_err(CoreError::from)?))
}

#[derive(Debug, Serialize)]
pub struct DatasetDetail {
    #[serde(flatten)]
    dataset: Dataset,
    catalog: Option<Catalog>,
}

pub async fn get_dataset(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
) -> Result<Json<DatasetDetail>, ApiError> {
    let dataset = state.registry.get_dataset(&dataset_id).map_err(CoreError::from)?;
    let catalog = state.registry.get_catalog(&dataset_id, false).ok();
    Ok(Json(DatasetDetail { dataset, catalog }))
}
