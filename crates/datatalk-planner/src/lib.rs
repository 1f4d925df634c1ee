//! The SQL planner and summarizer: turns `{analysis_type, catalog}`
//! into deterministic SQL, and turns executed results back into a
//! markdown message plus a structured audit record.

pub mod columns;
pub mod summarize;
pub mod templates;

pub use summarize::{summarize, TableSummary};
pub use templates::{plan, Plan};

use chrono::Utc;
use datatalk_core::{AuditRecord, Context, ExecutedQuery, ResultTable, RoutingMetadata};

/// Build the audit record for a turn. SQL for each executed result is
/// looked up by name in `context.last_planned_queries` — the planner
/// never re-derives SQL it already emitted. `results` is empty for turns
/// that only acknowledge or clarify, never dispatch a plan.
pub fn build_audit(
    dataset_id: &str,
    dataset_name: &str,
    context: &Context,
    results: &[ResultTable],
    ai_assist: bool,
    safe_mode: bool,
    privacy_mode: bool,
    routing_metadata: Option<RoutingMetadata>,
) -> AuditRecord {
    let executed_queries = results
        .iter()
        .map(|result| {
            let sql = context
                .last_planned_queries
                .iter()
                .find(|q| q.name == result.name)
                .map(|q| q.sql.clone())
                .unwrap_or_default();
            ExecutedQuery {
                name: result.name.clone(),
                sql,
                row_count: result.effective_row_count(),
            }
        })
        .collect();

    AuditRecord {
        dataset_id: dataset_id.to_string(),
        dataset_name: dataset_name.to_string(),
        analysis_type: context.analysis_type,
        time_period: context.time_period,
        ai_assist,
        safe_mode,
        privacy_mode,
        executed_queries,
        generated_at: Utc::now(),
        shared_with_ai: AuditRecord::shared_with_ai_trail(privacy_mode, safe_mode),
        routing_metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatalk_core::{AnalysisType, PlannedQuery};
    use serde_json::json;

    #[test]
    fn audit_carries_sql_from_the_saved_plan() {
        let mut ctx = Context::new();
        ctx.set_analysis_type(AnalysisType::RowCount);
        ctx.last_planned_queries = vec![PlannedQuery::new("row_count", "SELECT COUNT(*) AS row_count FROM data")];

        let results = vec![ResultTable {
            name: "row_count".to_string(),
            columns: vec!["row_count".to_string()],
            rows: vec![vec![json!(10)]],
            row_count: 1,
        }];

        let audit = build_audit("ds-1", "sales", &ctx, &results, false, false, true, None);
        assert_eq!(audit.executed_queries.len(), 1);
        assert_eq!(audit.executed_queries[0].sql, "SELECT COUNT(*) AS row_count FROM data");
        assert_eq!(audit.shared_with_ai, vec!["PII_redacted".to_string()]);
    }
}
