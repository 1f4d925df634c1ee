use axum::extract::State;
use axum::Json;
use datatalk_ai::ConnectionStatus;

use crate::state::AppState;

/// Always returns HTTP 200; the `status` field inside the body
/// discriminates connected/error/disabled, matching the probe contract.
pub async fn test_ai_connection(State(state): State<AppState>) -> Json<ConnectionStatus> {
    match &state.ai_extractor {
        Some(extractor) => Json(extractor.test_connection().await),
        None => Json(ConnectionStatus::Disabled {
            message: "AI Assist is not configured: set AI_MODE=on and DATATALK_AI_API_KEY.".to_string(),
        }),
    }
}
