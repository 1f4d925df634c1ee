//! The audit record attached to every chat response, and the routing
//! diagnostics carried alongside it.

use crate::conversation::{AnalysisType, TimePeriod};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a turn's analysis type was decided, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    Deterministic,
    AiIntentExtraction,
    ClarificationNeeded,
    DirectQuery,
}

/// Diagnostic metadata returned alongside every chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingMetadata {
    pub routing_decision: RoutingDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deterministic_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deterministic_match: Option<AnalysisType>,
    pub openai_invoked: bool,
    pub safe_mode: bool,
    pub privacy_mode: bool,
}

/// One executed query's audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedQuery {
    pub name: String,
    pub sql: String,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
}

/// The audit record attached to a `final_answer` (and, for routing
/// diagnostics, earlier turns too).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub dataset_id: String,
    pub dataset_name: String,
    pub analysis_type: Option<AnalysisType>,
    pub time_period: Option<TimePeriod>,
    pub ai_assist: bool,
    pub safe_mode: bool,
    pub privacy_mode: bool,
    pub executed_queries: Vec<ExecutedQuery>,
    pub generated_at: DateTime<Utc>,
    /// Trail of what was shared with an external component this turn,
    /// e.g. `"PII_redacted"`, `"safe_mode_no_raw_rows"`.
    pub shared_with_ai: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_metadata: Option<RoutingMetadata>,
}

impl AuditRecord {
    pub fn shared_with_ai_trail(privacy_mode: bool, safe_mode: bool) -> Vec<String> {
        let mut trail = Vec::new();
        if privacy_mode {
            trail.push("PII_redacted".to_string());
        }
        if safe_mode {
            trail.push("safe_mode_no_raw_rows".to_string());
        }
        trail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_with_ai_trail_reflects_both_flags() {
        assert!(AuditRecord::shared_with_ai_trail(false, false).is_empty());
        assert_eq!(
            AuditRecord::shared_with_ai_trail(true, false),
            vec!["PII_redacted".to_string()]
        );
        assert_eq!(
            AuditRecord::shared_with_ai_trail(true, true),
            vec!["PII_redacted".to_string(), "safe_mode_no_raw_rows".to_string()]
        );
        assert_eq!(
            AuditRecord::shared_with_ai_trail(false, true),
            vec!["safe_mode_no_raw_rows".to_string()]
        );
    }
}
