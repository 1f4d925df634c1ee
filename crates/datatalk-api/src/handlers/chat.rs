use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use datatalk_core::{CoreError, ResultTable};
use datatalk_registry::persistence::Report;
use datatalk_state::{ChatResponse, ChatTurn, ResultsContext};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::resolve_flag;
use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResultsContextBody {
    results: Vec<ResultTable>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "datasetId")]
    dataset_id: String,
    #[serde(rename = "conversationId")]
    conversation_id: Option<String>,
    message: Option<String>,
    intent: Option<String>,
    value: Option<JsonValue>,
    #[serde(rename = "privacyMode")]
    privacy_mode: Option<bool>,
    #[serde(rename = "safeMode")]
    safe_mode: Option<bool>,
    #[serde(rename = "aiAssist")]
    ai_assist: Option<bool>,
    #[serde(rename = "resultsContext")]
    results_context: Option<ResultsContextBody>,
    /// Opaque passthrough the core never inspects; carried only so a
    /// client can round-trip UI state across turns.
    #[serde(rename = "defaultsContext")]
    #[allow(dead_code)]
    defaults_context: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponseEnvelope {
    #[serde(rename = "conversationId")]
    conversation_id: String,
    #[serde(flatten)]
    response: ChatResponse,
}

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponseEnvelope>, ApiError> {
    let privacy_mode = resolve_flag(body.privacy_mode, &headers, "x-privacy-mode", true);
    let safe_mode = resolve_flag(body.safe_mode, &headers, "x-safe-mode", false);
    let ai_assist = resolve_flag(body.ai_assist, &headers, "x-ai-assist", false);

    let dataset = state
        .registry
        .get_dataset(&body.dataset_id)
        .map_err(CoreError::from)?;
    // The planner must always see real column names (SQL templates
    // reference them directly); only the copy handed to the AI intent
    // extractor is redacted under Privacy Mode.
    let catalog = state
        .registry
        .get_catalog(&body.dataset_id, false)
        .map_err(CoreError::from)?;
    let ai_catalog = if privacy_mode {
        datatalk_registry::redact::redact(&catalog)
    } else {
        catalog.clone()
    };

    let question = body.message.clone();
    let turn = ChatTurn {
        message: body.message,
        intent: body.intent,
        value: body.value,
        privacy_mode,
        safe_mode,
        ai_assist,
        results_context: body
            .results_context
            .map(|body| ResultsContext { results: body.results }),
    };

    let extractor = state.ai_extractor.as_deref();
    let (conversation_id, response) = state
        .conversations
        .process_turn(
            body.conversation_id,
            &dataset.id,
            &dataset.name,
            &catalog,
            &ai_catalog,
            turn,
            extractor,
        )
        .await?;

    if let ChatResponse::FinalAnswer { message, tables, audit, .. } = &response {
        let report = Report {
            id: format!("rep-{}", Uuid::new_v4()),
            dataset_id: dataset.id.clone(),
            dataset_name: dataset.name.clone(),
            conversation_id: conversation_id.clone(),
            question,
            message: message.clone(),
            tables: serde_json::to_value(tables).unwrap_or(JsonValue::Null),
            audit: serde_json::to_value(audit).unwrap_or(JsonValue::Null),
            created_at: Utc::now(),
        };
        if let Err(err) = state.registry.save_report(report) {
            tracing::warn!(error = %err, "failed to persist final_answer report");
        }
    }

    Ok(Json(ChatResponseEnvelope {
        conversation_id,
        response,
    }))
}
