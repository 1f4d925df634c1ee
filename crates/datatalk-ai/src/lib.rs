//! The external intent extractor: an optional HTTP client to an
//! OpenAI-compatible chat-completions endpoint, invoked only when the
//! deterministic router's confidence is too low and AI Assist is on.
//!
//! Its sole output is a five-field classification record — never SQL,
//! never a question back to the user, never free-form prose.

use async_trait::async_trait;
use datatalk_core::{AnalysisType, Catalog, TimePeriod};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sentinel the extractor uses for "no value" in the wire format: every
/// field is present, either a closed-set value or this literal.
pub const UNSPECIFIED: &str = "unspecified";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI Assist is not configured (no API key)")]
    NotConfigured,
    #[error("request to the AI provider failed: {0}")]
    RequestFailed(String),
    #[error("invalid response format from AI: {0}")]
    InvalidResponse(String),
}

/// The normalized result of one extraction call. Fields are `None` when
/// the model reported [`UNSPECIFIED`], an empty string, or `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedIntent {
    pub analysis_type: Option<AnalysisType>,
    pub time_period: Option<TimePeriod>,
    pub metric: Option<String>,
    pub group_by: Option<String>,
    pub date_column: Option<String>,
}

/// The provider's raw JSON shape before normalization. Every field is
/// required in the wire format (the model is instructed to always emit
/// `"unspecified"` rather than omit a key), but we tolerate omission too.
#[derive(Debug, Deserialize, Default)]
struct RawExtraction {
    #[serde(default)]
    analysis_type: Option<String>,
    #[serde(default)]
    time_period: Option<String>,
    #[serde(default)]
    metric: Option<String>,
    #[serde(default)]
    group_by: Option<String>,
    #[serde(default)]
    date_column: Option<String>,
}

fn normalize_string_field(raw: Option<String>) -> Option<String> {
    match raw {
        None => None,
        Some(s) if s.trim().is_empty() || s.eq_ignore_ascii_case(UNSPECIFIED) => None,
        Some(s) => Some(s),
    }
}

fn normalize(raw: RawExtraction) -> ExtractedIntent {
    let analysis_type = normalize_string_field(raw.analysis_type)
        .and_then(|s| AnalysisType::from_str_strict(&s));
    let time_period =
        normalize_string_field(raw.time_period).and_then(|s| TimePeriod::from_str_strict(&s));

    ExtractedIntent {
        analysis_type,
        time_period,
        metric: normalize_string_field(raw.metric),
        group_by: normalize_string_field(raw.group_by),
        date_column: normalize_string_field(raw.date_column),
    }
}

/// Strip a leading/trailing ```` ```json ```` or ` ``` ` code fence before
/// parsing, defensively — providers routinely wrap structured output in
/// markdown even when explicitly asked not to.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.trim_start().trim_end_matches("```").trim()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.trim_start().trim_end_matches("```").trim()
    } else {
        trimmed
    }
}

fn parse_extraction(raw_text: &str) -> Result<ExtractedIntent, AiError> {
    let cleaned = strip_code_fence(raw_text);
    let raw: RawExtraction = serde_json::from_str(cleaned).map_err(|e| {
        tracing::warn!(
            error = %e,
            raw_preview = %truncate(raw_text, 200),
            "failed to parse AI intent extraction response"
        );
        AiError::InvalidResponse(e.to_string())
    })?;
    Ok(normalize(raw))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// The outcome of probing the configured provider via `/test-ai-connection`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected { message: String },
    Error { message: String, details: String },
    Disabled { message: String },
}

#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, message: &str, catalog: &Catalog) -> Result<ExtractedIntent, AiError>;
    async fn test_connection(&self) -> ConnectionStatus;
}

/// Configuration for the OpenAI-compatible transport, read from
/// `DATATALK_AI_*` environment variables by the caller.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl AiConfig {
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("DATATALK_AI_API_KEY").ok()?;
        let base_url = std::env::var("DATATALK_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = std::env::var("DATATALK_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let timeout_secs: u64 = std::env::var("DATATALK_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);
        Some(Self {
            base_url,
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// A client against an OpenAI-compatible chat-completions endpoint. No
/// automatic retries — per the error handling design, the system performs
/// no automatic retries anywhere; the client may repost a turn instead.
pub struct OpenAiCompatibleClient {
    config: AiConfig,
    http: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(config: AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, http }
    }

    fn system_prompt(catalog: &Catalog) -> String {
        let columns: Vec<String> = catalog
            .columns
            .iter()
            .map(|c| format!("{} ({:?})", c.name, c.logical_type))
            .collect();
        format!(
            "You classify a user's analytical question about a tabular dataset into a \
             structured record. Respond with ONLY a JSON object with exactly these keys: \
             analysis_type, time_period, metric, group_by, date_column. \
             analysis_type must be one of: row_count, top_categories, trend, outliers, data_quality, or \"unspecified\". \
             time_period must be one of: last_7_days, last_30_days, last_90_days, all_time, or \"unspecified\". \
             metric, group_by, and date_column must each be a column name from the dataset below, or \"unspecified\". \
             Never omit a key. Never return SQL. Never ask a question. Never add prose outside the JSON object.\n\
             Dataset columns: {}",
            columns.join(", ")
        )
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

#[async_trait]
impl IntentExtractor for OpenAiCompatibleClient {
    async fn extract(&self, message: &str, catalog: &Catalog) -> Result<ExtractedIntent, AiError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt(catalog),
                },
                ChatMessage {
                    role: "user",
                    content: message.to_string(),
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AiError::RequestFailed(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::RequestFailed(e.to_string()))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AiError::InvalidResponse("no choices in provider response".to_string()))?;

        parse_extraction(content)
    }

    async fn test_connection(&self) -> ConnectionStatus {
        let probe = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: "respond with the single word: ok".to_string(),
            }],
        };

        let result = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&probe)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => ConnectionStatus::Connected {
                message: "AI provider reachable".to_string(),
            },
            Ok(response) => ConnectionStatus::Error {
                message: "AI provider returned an error".to_string(),
                details: format!("HTTP {}", response.status()),
            },
            Err(e) => ConnectionStatus::Error {
                message: "could not reach AI provider".to_string(),
                details: e.to_string(),
            },
        }
    }
}
