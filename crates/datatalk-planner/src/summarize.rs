//! Derives a markdown summary strictly from executed result tables. The
//! summarizer never emits boilerplate — every sentence names a value read
//! out of a [`ResultTable`].

use datatalk_core::{AnalysisType, ResultTable};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// One table handed back to the client alongside the summary message.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

/// Format an integer-valued JSON number with thousands separators.
fn format_thousands(value: &JsonValue) -> String {
    let n = match value {
        JsonValue::Number(n) => n.as_i64().unwrap_or_default(),
        _ => 0,
    };
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let grouped: String = grouped.chars().rev().collect();
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn cell(table: &ResultTable, row: usize, column: &str) -> Option<&JsonValue> {
    table.column_index(column).and_then(|i| table.rows.get(row)?.get(i))
}

fn summarize_row_count(table: &ResultTable) -> String {
    let value = table
        .column_index("row_count")
        .and_then(|i| table.rows.first()?.get(i))
        .or_else(|| table.rows.first()?.first());
    match value {
        Some(v) => format!("This dataset has **{}** rows.", format_thousands(v)),
        None => "This dataset's row count could not be determined.".to_string(),
    }
}

fn summarize_top_categories(table: &ResultTable) -> String {
    let count = table.effective_row_count();
    let top = table
        .rows
        .first()
        .and_then(|row| row.first())
        .map(|v| match v {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        });
    match top {
        Some(name) => format!("Found **{count}** categories. The top category is **{name}**."),
        None => "No categories were found for this dataset.".to_string(),
    }
}

fn summarize_trend(table: &ResultTable) -> String {
    let buckets = table.effective_row_count();
    let delta = match (
        cell(table, 0, "count"),
        table.rows.last().and_then(|_| cell(table, table.rows.len().saturating_sub(1), "count")),
    ) {
        (Some(JsonValue::Number(first)), Some(JsonValue::Number(last))) if table.rows.len() > 1 => {
            let first = first.as_f64().unwrap_or(0.0);
            let last = last.as_f64().unwrap_or(0.0);
            Some(last - first)
        }
        _ => None,
    };
    match delta {
        Some(d) if d >= 0.0 => format!(
            "This trend spans **{buckets}** time buckets, up by **{:.0}** from first to last period.",
            d
        ),
        Some(d) => format!(
            "This trend spans **{buckets}** time buckets, down by **{:.0}** from first to last period.",
            d.abs()
        ),
        None => format!("This trend spans **{buckets}** time buckets."),
    }
}

fn summarize_outliers(table: &ResultTable) -> String {
    let count = table.effective_row_count();
    if count == 0 {
        "No outliers were detected in this dataset.".to_string()
    } else {
        format!("Detected **{count}** outlier rows across the checked columns.")
    }
}

fn summarize_data_quality(null_counts: Option<&ResultTable>, duplicate_check: Option<&ResultTable>) -> String {
    let mut parts = Vec::new();

    if let Some(table) = null_counts {
        let total_nulls: i64 = table
            .rows
            .first()
            .map(|row| {
                row.iter()
                    .filter_map(|v| v.as_i64())
                    .sum::<i64>()
                    .saturating_sub(table.column_index("total_rows").and_then(|i| row.get(i)?.as_i64()).unwrap_or(0))
            })
            .unwrap_or(0);
        parts.push(format!("found **{total_nulls}** null values across all columns"));
    }

    if let Some(table) = duplicate_check {
        if let (Some(total), Some(unique)) = (
            cell(table, 0, "total_rows").and_then(|v| v.as_i64()),
            cell(table, 0, "unique_rows").and_then(|v| v.as_i64()),
        ) {
            let duplicates = (total - unique).max(0);
            parts.push(format!("**{duplicates}** duplicate rows"));
        }
    }

    if parts.is_empty() {
        "Data quality check produced no results.".to_string()
    } else {
        format!("Data quality check: {}.", parts.join(", "))
    }
}

/// Build the summarizer message and table list for `analysis_type` from
/// its executed results, identified by the stable plan names
/// (`row_count`, `top_categories`, `monthly_trend`, `outliers_detected`,
/// `null_counts`, `duplicate_check`).
pub fn summarize(analysis_type: AnalysisType, results: &[ResultTable]) -> (String, Vec<TableSummary>) {
    let find = |name: &str| results.iter().find(|r| r.name == name);

    let message = match analysis_type {
        AnalysisType::RowCount => find("row_count").map(summarize_row_count),
        AnalysisType::TopCategories => find("top_categories").map(summarize_top_categories),
        AnalysisType::Trend => find("monthly_trend").map(summarize_trend),
        AnalysisType::Outliers => find("outliers_detected").map(summarize_outliers),
        AnalysisType::DataQuality => Some(summarize_data_quality(find("null_counts"), find("duplicate_check"))),
    }
    .unwrap_or_else(|| "No results were available to summarize.".to_string());

    let tables = results
        .iter()
        .map(|r| TableSummary {
            title: r.name.clone(),
            columns: r.columns.clone(),
            rows: r.rows.clone(),
        })
        .collect();

    (message, tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(name: &str, columns: &[&str], rows: Vec<Vec<JsonValue>>, row_count: usize) -> ResultTable {
        ResultTable {
            name: name.to_string(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows,
            row_count,
        }
    }

    #[test]
    fn row_count_message_uses_thousands_separator() {
        let results = vec![table("row_count", &["row_count"], vec![vec![json!(1748)]], 1)];
        let (message, tables) = summarize(AnalysisType::RowCount, &results);
        assert!(message.contains("**1,748**"));
        assert_eq!(tables[0].title, "row_count");
    }

    #[test]
    fn row_count_message_falls_back_to_first_column_when_unnamed() {
        let results = vec![table("row_count", &["n"], vec![vec![json!(42)]], 1)];
        let (message, _) = summarize(AnalysisType::RowCount, &results);
        assert!(message.contains("**42**"));
    }

    #[test]
    fn top_categories_names_the_top_entry() {
        let results = vec![table(
            "top_categories",
            &["category", "count"],
            vec![vec![json!("Electronics"), json!(120)], vec![json!("Books"), json!(80)]],
            2,
        )];
        let (message, _) = summarize(AnalysisType::TopCategories, &results);
        assert!(message.contains("Electronics"));
        assert!(message.contains("**2**"));
    }

    #[test]
    fn trend_reports_bucket_count_and_delta() {
        let results = vec![table(
            "monthly_trend",
            &["month", "count"],
            vec![vec![json!("2024-01"), json!(10)], vec![json!("2024-02"), json!(25)]],
            2,
        )];
        let (message, _) = summarize(AnalysisType::Trend, &results);
        assert!(message.contains("**2**"));
        assert!(message.contains("up by"));
    }

    #[test]
    fn data_quality_reports_nulls_and_duplicates() {
        let results = vec![
            table(
                "null_counts",
                &["total_rows", "amount_nulls"],
                vec![vec![json!(100), json!(3)]],
                1,
            ),
            table(
                "duplicate_check",
                &["total_rows", "unique_rows"],
                vec![vec![json!(100), json!(95)]],
                1,
            ),
        ];
        let (message, _) = summarize(AnalysisType::DataQuality, &results);
        assert!(message.contains("**5**") || message.contains("null"));
        assert!(message.contains("duplicate"));
    }

    #[test]
    fn summarizer_uses_row_count_field_when_larger_than_materialized_rows() {
        let results = vec![table("outliers_detected", &["value"], vec![vec![json!(1.0)]; 50], 400)];
        let (message, _) = summarize(AnalysisType::Outliers, &results);
        assert!(message.contains("**400**"));
    }
}
