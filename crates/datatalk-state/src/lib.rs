//! The conversation state machine: interprets each turn, updates
//! the per-conversation context, and decides between asking for
//! clarification, calling the AI intent extractor, dispatching a plan,
//! or summarizing results.

use dashmap::DashMap;
use datatalk_ai::{ExtractedIntent, IntentExtractor};
use datatalk_core::{
    AnalysisType, AuditRecord, Catalog, Context, CoreError, ResultTable, RoutingDecision,
    RoutingMetadata, TimePeriod,
};
use datatalk_planner::TableSummary;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Mutex;

/// A single incoming turn, already stripped of HTTP framing concerns
/// (header/body mode-flag resolution happens one layer up).
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub message: Option<String>,
    pub intent: Option<String>,
    pub value: Option<JsonValue>,
    pub privacy_mode: bool,
    pub safe_mode: bool,
    pub ai_assist: bool,
    pub results_context: Option<ResultsContext>,
}

#[derive(Debug, Clone)]
pub struct ResultsContext {
    pub results: Vec<ResultTable>,
}

/// A redacted, read-only snapshot of `Context`'s closed-set fields,
/// returned on `intent_acknowledged` responses.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot {
    pub analysis_type: Option<AnalysisType>,
    pub time_period: Option<TimePeriod>,
    pub metric: Option<String>,
    pub group_by: Option<String>,
    pub date_column: Option<String>,
}

impl From<&Context> for ContextSnapshot {
    fn from(ctx: &Context) -> Self {
        Self {
            analysis_type: ctx.analysis_type,
            time_period: ctx.time_period,
            metric: ctx.metric.clone(),
            group_by: ctx.group_by.clone(),
            date_column: ctx.date_column.clone(),
        }
    }
}

/// The four response shapes dispatched over `/chat`, discriminated by
/// `type` in the wire format.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatResponse {
    NeedsClarification {
        question: String,
        choices: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        intent: Option<String>,
        #[serde(rename = "allowFreeText")]
        allow_free_text: bool,
        audit: AuditRecord,
        #[serde(skip_serializing_if = "Option::is_none")]
        routing_metadata: Option<RoutingMetadata>,
    },
    IntentAcknowledged {
        intent: String,
        value: JsonValue,
        state: ContextSnapshot,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        routing_metadata: Option<RoutingMetadata>,
    },
    RunQueries {
        queries: Vec<datatalk_core::PlannedQuery>,
        explanation: Option<String>,
        audit: AuditRecord,
        #[serde(skip_serializing_if = "Option::is_none")]
        routing_metadata: Option<RoutingMetadata>,
    },
    FinalAnswer {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tables: Option<Vec<TableSummary>>,
        audit: AuditRecord,
        #[serde(skip_serializing_if = "Option::is_none")]
        routing_metadata: Option<RoutingMetadata>,
    },
}

const ANALYSIS_TYPE_CHOICES: [&str; 5] = [
    "Row count",
    "Top categories",
    "Trend",
    "Outliers",
    "Data quality",
];
const TIME_PERIOD_CHOICES: [&str; 4] = ["Last 7 days", "Last 30 days", "Last 90 days", "All time"];

/// Display-label → internal closed-set value. Values with no entry pass
/// through unchanged.
fn map_intent_value(value: &str) -> String {
    match value {
        "Row count" => "row_count",
        "Top categories" => "top_categories",
        "Trend" => "trend",
        "Outliers" => "outliers",
        "Data quality" => "data_quality",
        "Last 7 days" => "last_7_days",
        "Last 30 days" => "last_30_days",
        "Last 90 days" => "last_90_days",
        "All time" => "all_time",
        other => other,
    }
    .to_string()
}

fn guidance_message() -> String {
    "I can help with trends, top categories, outliers, row counts, and data quality checks. \
     Try asking a more specific question, pick one of these analyses directly, or turn on \
     AI Assist for more flexible understanding."
        .to_string()
}

/// Owns the per-conversation context map. Conversations are lost on
/// restart; nothing here is persisted.
pub struct ConversationStore {
    contexts: DashMap<String, Mutex<Context>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            contexts: DashMap::new(),
        }
    }

    fn mint_conversation_id() -> String {
        format!("conv-{}", uuid::Uuid::new_v4())
    }

    /// Process one turn against `dataset_id`/`dataset_name`/`catalog`.
    /// `catalog` is always the real, unredacted schema and is the only one
    /// the planner ever sees (SQL templates must reference real column
    /// names). `ai_catalog` is what gets shared with the AI intent
    /// extractor, and is the caller's redacted copy when Privacy Mode is
    /// on. `ai_extractor` is `None` when no provider is configured; in
    /// that case AI Assist requests fall through to the static guidance
    /// reply.
    pub async fn process_turn(
        &self,
        conversation_id: Option<String>,
        dataset_id: &str,
        dataset_name: &str,
        catalog: &Catalog,
        ai_catalog: &Catalog,
        turn: ChatTurn,
        ai_extractor: Option<&dyn IntentExtractor>,
    ) -> Result<(String, ChatResponse), CoreError> {
        validate_envelope(&turn)?;

        let conversation_id = conversation_id.unwrap_or_else(Self::mint_conversation_id);

        // Results-context turns skip routing entirely: the client is
        // reposting results for the plan this conversation already owns.
        if let Some(results_context) = turn.results_context.clone() {
            let ctx_snapshot = {
                let lock = self
                    .contexts
                    .entry(conversation_id.clone())
                    .or_insert_with(|| Mutex::new(Context::new()));
                lock.lock().expect("conversation context mutex poisoned").clone()
            };
            let analysis_type = ctx_snapshot.analysis_type.ok_or_else(|| {
                CoreError::protocol_violation("resultsContext posted with no analysis type in context")
            })?;
            let (message, tables) = datatalk_planner::summarize(analysis_type, &results_context.results);
            let audit = datatalk_planner::build_audit(
                dataset_id,
                dataset_name,
                &ctx_snapshot,
                &results_context.results,
                turn.ai_assist,
                turn.safe_mode,
                turn.privacy_mode,
                None,
            );
            return Ok((
                conversation_id,
                ChatResponse::FinalAnswer {
                    message,
                    tables: Some(tables),
                    audit,
                    routing_metadata: None,
                },
            ));
        }

        let lock = self
            .contexts
            .entry(conversation_id.clone())
            .or_insert_with(|| Mutex::new(Context::new()));
        let mut ctx = lock.lock().expect("conversation context mutex poisoned");

        let via_intent = turn.intent.is_some();
        let routing_metadata = if let Some(intent) = turn.intent.clone() {
            apply_intent(&mut ctx, &intent, turn.value.clone().unwrap_or(JsonValue::Null));
            None
        } else {
            let message = turn.message.clone().unwrap_or_default();
            match route_free_text(&mut ctx, &message, turn.ai_assist, ai_extractor, ai_catalog).await {
                FreeTextOutcome::Resolved(metadata) => Some(metadata),
                FreeTextOutcome::Clarify(response) => {
                    return Ok((conversation_id, response));
                }
            }
        };

        if ctx.is_ready() {
            let response = dispatch(dataset_id, dataset_name, &mut ctx, catalog, &turn, routing_metadata);
            return Ok((conversation_id, response));
        }

        if ctx.analysis_type.is_none() {
            return Ok((
                conversation_id,
                needs_clarification_analysis_type(dataset_id, dataset_name, &ctx, &turn, routing_metadata),
            ));
        }

        // Only time_period is missing. On the intent path this is a
        // lighter acknowledgment, matching the behavior a single intent
        // click demonstrates; on any other path it's a full clarification.
        if via_intent {
            return Ok((
                conversation_id,
                ChatResponse::IntentAcknowledged {
                    intent: turn.intent.clone().unwrap_or_default(),
                    value: turn.value.clone().unwrap_or(JsonValue::Null),
                    state: ContextSnapshot::from(&*ctx),
                    message: "What time period should this cover?".to_string(),
                    routing_metadata,
                },
            ));
        }

        Ok((
            conversation_id,
            needs_clarification_time_period(dataset_id, dataset_name, &ctx, &turn, routing_metadata),
        ))
    }
}

fn validate_envelope(turn: &ChatTurn) -> Result<(), CoreError> {
    if turn.results_context.is_some() {
        return Ok(());
    }
    let has_message = turn
        .message
        .as_ref()
        .map(|m| !m.trim().is_empty())
        .unwrap_or(false);
    let has_intent = turn.intent.is_some();

    if has_message == has_intent {
        return Err(CoreError::protocol_violation(
            "exactly one of message or intent is required",
        ));
    }
    if has_intent && turn.value.is_none() {
        return Err(CoreError::protocol_violation(
            "value is required when intent is present",
        ));
    }
    Ok(())
}

fn apply_intent(ctx: &mut Context, intent: &str, value: JsonValue) {
    let raw = match &value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mapped = map_intent_value(&raw);

    match intent {
        "set_analysis_type" => {
            if let Some(parsed) = AnalysisType::from_str_strict(&mapped) {
                ctx.set_analysis_type(parsed);
            }
        }
        "set_time_period" => {
            if let Some(parsed) = TimePeriod::from_str_strict(&mapped) {
                ctx.set_time_period(parsed);
            }
        }
        "set_metric" => ctx.metric = Some(mapped),
        "set_group_by" => ctx.group_by = Some(mapped),
        "set_date_column" => ctx.date_column = Some(mapped),
        _ => tracing::warn!(intent, "unrecognized intent name, ignoring"),
    }
}

enum FreeTextOutcome {
    Resolved(RoutingMetadata),
    Clarify(ChatResponse),
}

async fn route_free_text(
    ctx: &mut Context,
    message: &str,
    ai_assist: bool,
    ai_extractor: Option<&dyn IntentExtractor>,
    ai_catalog: &Catalog,
) -> FreeTextOutcome {
    if ctx.is_ready() {
        return FreeTextOutcome::Resolved(RoutingMetadata {
            routing_decision: RoutingDecision::DirectQuery,
            deterministic_confidence: None,
            deterministic_match: None,
            openai_invoked: false,
            safe_mode: false,
            privacy_mode: false,
        });
    }

    let route_result = datatalk_router::route(message);
    if route_result.is_high_confidence() {
        if let Some(analysis_type) = route_result.analysis_type {
            ctx.set_analysis_type(analysis_type);
        }
        if let Some(time_period) = route_result.time_period {
            ctx.set_time_period(time_period);
        }
        return FreeTextOutcome::Resolved(RoutingMetadata {
            routing_decision: RoutingDecision::Deterministic,
            deterministic_confidence: Some(route_result.confidence),
            deterministic_match: route_result.analysis_type,
            openai_invoked: false,
            safe_mode: false,
            privacy_mode: false,
        });
    }

    if ai_assist {
        if let Some(extractor) = ai_extractor {
            return match extractor.extract(message, ai_catalog).await {
                Ok(extracted) => {
                    merge_extracted(ctx, &extracted);
                    FreeTextOutcome::Resolved(RoutingMetadata {
                        routing_decision: RoutingDecision::AiIntentExtraction,
                        deterministic_confidence: Some(route_result.confidence),
                        deterministic_match: route_result.analysis_type,
                        openai_invoked: true,
                        safe_mode: false,
                        privacy_mode: false,
                    })
                }
                Err(err) => {
                    tracing::warn!(error = %err, "AI intent extraction failed");
                    FreeTextOutcome::Clarify(ChatResponse::FinalAnswer {
                        message: format!(
                            "I couldn't get a classification from the AI provider ({err}). \
                             Try rephrasing, or pick an analysis type directly."
                        ),
                        tables: None,
                        audit: empty_audit(ctx),
                        routing_metadata: None,
                    })
                }
            };
        }
        return FreeTextOutcome::Clarify(ChatResponse::FinalAnswer {
            message: "AI Assist is on, but no AI provider is configured.".to_string(),
            tables: None,
            audit: empty_audit(ctx),
            routing_metadata: None,
        });
    }

    if !ctx.clarification_asked {
        ctx.clarification_asked = true;
        FreeTextOutcome::Clarify(ChatResponse::NeedsClarification {
            question: "What kind of analysis would you like?".to_string(),
            choices: ANALYSIS_TYPE_CHOICES.iter().map(|s| s.to_string()).collect(),
            intent: Some("set_analysis_type".to_string()),
            allow_free_text: false,
            audit: empty_audit(ctx),
            routing_metadata: None,
        })
    } else {
        FreeTextOutcome::Clarify(ChatResponse::FinalAnswer {
            message: guidance_message(),
            tables: None,
            audit: empty_audit(ctx),
            routing_metadata: None,
        })
    }
}

fn merge_extracted(ctx: &mut Context, extracted: &ExtractedIntent) {
    if let Some(analysis_type) = extracted.analysis_type {
        ctx.set_analysis_type(analysis_type);
    }
    if let Some(time_period) = extracted.time_period {
        ctx.set_time_period(time_period);
    }
    if let Some(metric) = &extracted.metric {
        ctx.metric = Some(metric.clone());
    }
    if let Some(group_by) = &extracted.group_by {
        ctx.group_by = Some(group_by.clone());
    }
    if let Some(date_column) = &extracted.date_column {
        ctx.date_column = Some(date_column.clone());
    }
}

fn empty_audit(ctx: &Context) -> AuditRecord {
    datatalk_planner::build_audit("", "", ctx, &[], false, false, false, None)
}

fn needs_clarification_analysis_type(
    dataset_id: &str,
    dataset_name: &str,
    ctx: &Context,
    turn: &ChatTurn,
    routing_metadata: Option<RoutingMetadata>,
) -> ChatResponse {
    ChatResponse::NeedsClarification {
        question: "What kind of analysis would you like?".to_string(),
        choices: ANALYSIS_TYPE_CHOICES.iter().map(|s| s.to_string()).collect(),
        intent: Some("set_analysis_type".to_string()),
        allow_free_text: false,
        audit: datatalk_planner::build_audit(
            dataset_id,
            dataset_name,
            ctx,
            &[],
            turn.ai_assist,
            turn.safe_mode,
            turn.privacy_mode,
            None,
        ),
        routing_metadata,
    }
}

fn needs_clarification_time_period(
    dataset_id: &str,
    dataset_name: &str,
    ctx: &Context,
    turn: &ChatTurn,
    routing_metadata: Option<RoutingMetadata>,
) -> ChatResponse {
    ChatResponse::NeedsClarification {
        question: "What time period should this cover?".to_string(),
        choices: TIME_PERIOD_CHOICES.iter().map(|s| s.to_string()).collect(),
        intent: Some("set_time_period".to_string()),
        allow_free_text: false,
        audit: datatalk_planner::build_audit(
            dataset_id,
            dataset_name,
            ctx,
            &[],
            turn.ai_assist,
            turn.safe_mode,
            turn.privacy_mode,
            None,
        ),
        routing_metadata,
    }
}

fn dispatch(
    dataset_id: &str,
    dataset_name: &str,
    ctx: &mut Context,
    catalog: &Catalog,
    turn: &ChatTurn,
    routing_metadata: Option<RoutingMetadata>,
) -> ChatResponse {
    let analysis_type = ctx
        .analysis_type
        .expect("dispatch is only reached once the context is ready");
    let mut plan = datatalk_planner::plan(analysis_type, catalog, turn.safe_mode);

    for query in plan.queries.iter_mut() {
        match datatalk_validator::validate(&query.sql, turn.safe_mode, datatalk_executor::L_EXEC) {
            Ok(validated) => query.sql = validated.sql,
            Err(rejection) => {
                return validation_rejected(dataset_id, dataset_name, ctx, turn, &rejection, routing_metadata);
            }
        }
    }

    ctx.last_planned_queries = plan.queries.clone();

    ChatResponse::RunQueries {
        queries: plan.queries,
        explanation: plan.explanation,
        audit: datatalk_planner::build_audit(
            dataset_id,
            dataset_name,
            ctx,
            &[],
            turn.ai_assist,
            turn.safe_mode,
            turn.privacy_mode,
            None,
        ),
        routing_metadata,
    }
}

/// A planned query failed validation before it was ever handed to the
/// client — the same rejection reasons `/queries/execute` reports as
/// `validation_failed`, surfaced here as a fresh clarification instead of
/// an opaque `run_queries` the client could never execute successfully.
fn validation_rejected(
    dataset_id: &str,
    dataset_name: &str,
    ctx: &Context,
    turn: &ChatTurn,
    rejection: &datatalk_validator::Rejection,
    routing_metadata: Option<RoutingMetadata>,
) -> ChatResponse {
    ChatResponse::NeedsClarification {
        question: format!(
            "That analysis couldn't be planned into a safe query ({rejection}). \
             What kind of analysis would you like instead?"
        ),
        choices: ANALYSIS_TYPE_CHOICES.iter().map(|s| s.to_string()).collect(),
        intent: Some("set_analysis_type".to_string()),
        allow_free_text: false,
        audit: datatalk_planner::build_audit(
            dataset_id,
            dataset_name,
            ctx,
            &[],
            turn.ai_assist,
            turn.safe_mode,
            turn.privacy_mode,
            None,
        ),
        routing_metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatalk_core::ErrorKind;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog {
            dataset_id: "ds-1".to_string(),
            columns: vec![],
        }
    }

    #[tokio::test]
    async fn protocol_violation_on_empty_message() {
        let store = ConversationStore::new();
        let turn = ChatTurn::default();
        let err = store
            .process_turn(None, "ds-1", "sales", &catalog(), &catalog(), turn, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProtocolViolation);
    }

    #[tokio::test]
    async fn protocol_violation_when_both_message_and_intent_present() {
        let store = ConversationStore::new();
        let turn = ChatTurn {
            message: Some("how many rows".to_string()),
            intent: Some("set_analysis_type".to_string()),
            value: Some(json!("Row count")),
            ..Default::default()
        };
        let err = store
            .process_turn(None, "ds-1", "sales", &catalog(), &catalog(), turn, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProtocolViolation);
    }

    #[tokio::test]
    async fn high_confidence_row_count_message_dispatches_run_queries() {
        let store = ConversationStore::new();
        let turn = ChatTurn {
            message: Some("what is the row count".to_string()),
            ..Default::default()
        };
        let (_, response) = store
            .process_turn(None, "ds-1", "sales", &catalog(), &catalog(), turn, None)
            .await
            .unwrap();
        match response {
            ChatResponse::RunQueries { queries, .. } => {
                assert_eq!(queries[0].name, "row_count");
            }
            other => panic!("expected RunQueries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_validates_and_caps_the_planned_sql() {
        let store = ConversationStore::new();
        let turn = ChatTurn {
            message: Some("what is the row count".to_string()),
            ..Default::default()
        };
        let (_, response) = store
            .process_turn(None, "ds-1", "sales", &catalog(), &catalog(), turn, None)
            .await
            .unwrap();
        match response {
            ChatResponse::RunQueries { queries, .. } => {
                assert!(queries[0].sql.to_uppercase().contains("LIMIT"));
            }
            other => panic!("expected RunQueries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_plans_against_the_real_catalog_not_the_ai_catalog() {
        use datatalk_core::{ColumnMeta, LogicalType};

        let real_catalog = Catalog {
            dataset_id: "ds-1".to_string(),
            columns: vec![ColumnMeta {
                name: "customer_email".to_string(),
                logical_type: LogicalType::Text,
                nullable: true,
                stats: None,
            }],
        };
        let redacted_ai_catalog = Catalog {
            dataset_id: "ds-1".to_string(),
            columns: vec![ColumnMeta {
                name: "PII_EMAIL_1".to_string(),
                logical_type: LogicalType::Text,
                nullable: true,
                stats: None,
            }],
        };

        let store = ConversationStore::new();
        let turn = ChatTurn {
            intent: Some("set_analysis_type".to_string()),
            value: Some(json!("Data quality")),
            ..Default::default()
        };
        let (_, response) = store
            .process_turn(None, "ds-1", "sales", &real_catalog, &redacted_ai_catalog, turn, None)
            .await
            .unwrap();
        match response {
            ChatResponse::RunQueries { queries, .. } => {
                assert!(queries[0].sql.contains("customer_email"));
                assert!(!queries[0].sql.contains("PII_EMAIL_1"));
            }
            other => panic!("expected RunQueries, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn low_confidence_message_asks_for_analysis_type_then_falls_back_to_guidance() {
        let store = ConversationStore::new();
        let conversation_id = Some("conv-fixed".to_string());

        let turn1 = ChatTurn {
            message: Some("tell me something interesting".to_string()),
            ..Default::default()
        };
        let (conversation_id, response1) = store
            .process_turn(conversation_id, "ds-1", "sales", &catalog(), &catalog(), turn1, None)
            .await
            .unwrap();
        assert!(matches!(response1, ChatResponse::NeedsClarification { .. }));

        let turn2 = ChatTurn {
            message: Some("still nothing specific".to_string()),
            ..Default::default()
        };
        let (_, response2) = store
            .process_turn(Some(conversation_id), "ds-1", "sales", &catalog(), &catalog(), turn2, None)
            .await
            .unwrap();
        match response2 {
            ChatResponse::FinalAnswer { message, .. } => {
                assert!(message.contains("AI Assist"));
            }
            other => panic!("expected FinalAnswer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn intent_click_on_time_bound_type_acknowledges_without_clarification() {
        let store = ConversationStore::new();
        let turn = ChatTurn {
            intent: Some("set_analysis_type".to_string()),
            value: Some(json!("Trend")),
            ..Default::default()
        };
        let (_, response) = store
            .process_turn(None, "ds-1", "sales", &catalog(), &catalog(), turn, None)
            .await
            .unwrap();
        match response {
            ChatResponse::IntentAcknowledged { intent, state, .. } => {
                assert_eq!(intent, "set_analysis_type");
                assert_eq!(state.analysis_type, Some(AnalysisType::Trend));
                assert!(state.time_period.is_none());
            }
            other => panic!("expected IntentAcknowledged, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn intent_set_analysis_type_then_time_period_dispatches() {
        let store = ConversationStore::new();
        let conversation_id = Some("conv-fixed-2".to_string());

        let turn1 = ChatTurn {
            intent: Some("set_analysis_type".to_string()),
            value: Some(json!("Trend")),
            ..Default::default()
        };
        let (conversation_id, _) = store
            .process_turn(conversation_id, "ds-1", "sales", &catalog(), &catalog(), turn1, None)
            .await
            .unwrap();

        let turn2 = ChatTurn {
            intent: Some("set_time_period".to_string()),
            value: Some(json!("Last 30 days")),
            ..Default::default()
        };
        let (_, response2) = store
            .process_turn(Some(conversation_id), "ds-1", "sales", &catalog(), &catalog(), turn2, None)
            .await
            .unwrap();
        assert!(matches!(response2, ChatResponse::RunQueries { .. }));
    }

    #[tokio::test]
    async fn row_count_intent_is_ready_immediately_since_time_independent() {
        let store = ConversationStore::new();
        let turn = ChatTurn {
            intent: Some("set_analysis_type".to_string()),
            value: Some(json!("Row count")),
            ..Default::default()
        };
        let (_, response) = store
            .process_turn(None, "ds-1", "sales", &catalog(), &catalog(), turn, None)
            .await
            .unwrap();
        assert!(matches!(response, ChatResponse::RunQueries { .. }));
    }

    #[tokio::test]
    async fn results_context_turn_summarizes_without_replanning() {
        let store = ConversationStore::new();
        let conversation_id = Some("conv-fixed-3".to_string());

        let turn1 = ChatTurn {
            intent: Some("set_analysis_type".to_string()),
            value: Some(json!("Row count")),
            ..Default::default()
        };
        let (conversation_id, _) = store
            .process_turn(conversation_id, "ds-1", "sales", &catalog(), &catalog(), turn1, None)
            .await
            .unwrap();

        let turn2 = ChatTurn {
            results_context: Some(ResultsContext {
                results: vec![ResultTable {
                    name: "row_count".to_string(),
                    columns: vec!["row_count".to_string()],
                    rows: vec![vec![json!(42)]],
                    row_count: 1,
                }],
            }),
            ..Default::default()
        };
        let (_, response2) = store
            .process_turn(Some(conversation_id), "ds-1", "sales", &catalog(), &catalog(), turn2, None)
            .await
            .unwrap();
        match response2 {
            ChatResponse::FinalAnswer { message, tables, .. } => {
                assert!(message.contains("42"));
                assert_eq!(tables.unwrap().len(), 1);
            }
            other => panic!("expected FinalAnswer, got {other:?}"),
        }
    }

    #[test]
    fn intent_value_mapping_translates_display_labels() {
        assert_eq!(map_intent_value("Row count"), "row_count");
        assert_eq!(map_intent_value("Last 30 days"), "last_30_days");
        assert_eq!(map_intent_value("Whatever"), "Whatever");
    }
}
