//! Per-analysis-type SQL templates. Every template is testable,
//! auditable, and immune to prompt drift: the only place natural-language
//! understanding enters SQL generation is intent extraction, whose output
//! is a small structured record, never SQL.

use crate::columns;
use datatalk_core::ident::quote_ident;
use datatalk_core::{AnalysisType, Catalog, PlannedQuery};

/// A planned set of queries plus an optional explanation shown to the
/// user when the planner had to fall back (e.g. no categorical column).
pub struct Plan {
    pub queries: Vec<PlannedQuery>,
    pub explanation: Option<String>,
}

fn row_count_query() -> PlannedQuery {
    PlannedQuery::new("row_count", "SELECT COUNT(*) AS row_count FROM data")
}

fn row_count_fallback(reason: &str) -> Plan {
    Plan {
        queries: vec![row_count_query()],
        explanation: Some(reason.to_string()),
    }
}

/// `(SELECT AVG("c") FROM data WHERE "c" IS NOT NULL)`-shaped correlated
/// subqueries so every reference to a column's mean/stddev in one query
/// uses the same population statistics.
fn mean_subquery(col: &str) -> String {
    format!("(SELECT AVG({col}) FROM data WHERE {col} IS NOT NULL)")
}

fn stddev_subquery(col: &str) -> String {
    format!("(SELECT STDDEV({col}) FROM data WHERE {col} IS NOT NULL)")
}

/// Build the plan for `analysis_type` against `catalog`. `safe_mode`
/// selects the aggregated outliers variant when the analysis type is
/// `outliers`; other analysis types are unaffected by Safe Mode (their
/// templates are already aggregation-only or intrinsically safe).
pub fn plan(analysis_type: AnalysisType, catalog: &Catalog, safe_mode: bool) -> Plan {
    match analysis_type {
        AnalysisType::RowCount => Plan {
            queries: vec![row_count_query()],
            explanation: None,
        },
        AnalysisType::TopCategories => plan_top_categories(catalog),
        AnalysisType::Trend => plan_trend(catalog),
        AnalysisType::Outliers => plan_outliers(catalog, safe_mode),
        AnalysisType::DataQuality => plan_data_quality(catalog),
    }
}

fn plan_top_categories(catalog: &Catalog) -> Plan {
    let Some(category) = columns::best_categorical_column(catalog) else {
        return row_count_fallback("no categorical column was found in this dataset");
    };
    let cat = quote_ident(&category.name);
    let sql = format!(
        "SELECT {cat} AS category, COUNT(*) AS count FROM data GROUP BY {cat} ORDER BY count DESC LIMIT 20"
    );
    Plan {
        queries: vec![PlannedQuery::new("top_categories", sql)],
        explanation: None,
    }
}

fn plan_trend(catalog: &Catalog) -> Plan {
    let Some(date) = columns::date_column(catalog) else {
        return row_count_fallback("no date column was found in this dataset");
    };
    let date_col = quote_ident(&date.name);

    let sql = match columns::metric_column(catalog) {
        Some(metric) => {
            let metric_col = quote_ident(&metric.name);
            format!(
                "SELECT DATE_TRUNC('month', {date_col}) AS month, COUNT(*) AS count, \
                 SUM({metric_col}) AS total_{metric_name}, AVG({metric_col}) AS avg_{metric_name} \
                 FROM data GROUP BY month ORDER BY month LIMIT 200",
                metric_name = metric.name
            )
        }
        None => format!(
            "SELECT DATE_TRUNC('month', {date_col}) AS month, COUNT(*) AS count \
             FROM data GROUP BY month ORDER BY month LIMIT 200"
        ),
    };
    Plan {
        queries: vec![PlannedQuery::new("monthly_trend", sql)],
        explanation: None,
    }
}

fn plan_outliers(catalog: &Catalog, safe_mode: bool) -> Plan {
    let numeric = columns::numeric_columns(catalog);
    if numeric.is_empty() {
        return row_count_fallback("no numeric column was found for outlier detection");
    }

    let branches: Vec<String> = numeric
        .iter()
        .map(|c| {
            let col = quote_ident(&c.name);
            let mean = mean_subquery(&col);
            let stddev = stddev_subquery(&col);
            if safe_mode {
                format!(
                    "SELECT '{name}' AS column_name, COUNT(*) AS outlier_count, \
                     {mean} AS mean, {stddev} AS stddev, \
                     MIN({col}) AS min_value, MAX({col}) AS max_value \
                     FROM data WHERE {col} IS NOT NULL AND ABS({col} - {mean}) > 2 * {stddev}",
                    name = c.name
                )
            } else {
                format!(
                    "SELECT '{name}' AS column_name, {col} AS value, \
                     {mean} AS mean, {stddev} AS stddev, \
                     ({col} - {mean}) / NULLIF({stddev}, 0) AS z_score, \
                     ROW_NUMBER() OVER () AS row_index \
                     FROM data WHERE {col} IS NOT NULL AND ABS({col} - {mean}) > 2 * {stddev} \
                     LIMIT 50",
                    name = c.name
                )
            }
        })
        .collect();

    let union = branches.join(" UNION ALL ");
    let sql = format!("SELECT * FROM ({union}) AS outliers LIMIT 200");
    Plan {
        queries: vec![PlannedQuery::new("outliers_detected", sql)],
        explanation: None,
    }
}

fn plan_data_quality(catalog: &Catalog) -> Plan {
    if catalog.columns.is_empty() {
        return Plan {
            queries: vec![PlannedQuery::new(
                "null_counts",
                "SELECT COUNT(*) AS total_rows FROM data",
            )],
            explanation: Some("dataset has no columns to check for nulls or duplicates".to_string()),
        };
    }

    let null_columns: Vec<String> = catalog
        .columns
        .iter()
        .map(|c| {
            let col = quote_ident(&c.name);
            format!("SUM(CASE WHEN {col} IS NULL THEN 1 ELSE 0 END) AS {}_nulls", c.name)
        })
        .collect();
    let null_counts_sql = format!(
        "SELECT COUNT(*) AS total_rows, {} FROM data",
        null_columns.join(", ")
    );

    let duplicate_check_sql = "SELECT COUNT(*) AS total_rows, COUNT(DISTINCT *) AS unique_rows FROM data".to_string();

    Plan {
        queries: vec![
            PlannedQuery::new("null_counts", null_counts_sql),
            PlannedQuery::new("duplicate_check", duplicate_check_sql),
        ],
        explanation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatalk_core::{ColumnMeta, LogicalType};

    fn col(name: &str, ty: LogicalType) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            logical_type: ty,
            nullable: true,
            stats: None,
        }
    }

    fn catalog(columns: Vec<ColumnMeta>) -> Catalog {
        Catalog {
            dataset_id: "ds-1".to_string(),
            columns,
        }
    }

    #[test]
    fn row_count_template_is_exact() {
        let p = plan(AnalysisType::RowCount, &catalog(vec![]), false);
        assert_eq!(p.queries.len(), 1);
        assert_eq!(p.queries[0].sql, "SELECT COUNT(*) AS row_count FROM data");
        assert_eq!(p.queries[0].name, "row_count");
    }

    #[test]
    fn top_categories_falls_back_without_a_categorical_column() {
        let p = plan(AnalysisType::TopCategories, &catalog(vec![col("amount", LogicalType::Double)]), false);
        assert_eq!(p.queries[0].name, "row_count");
        assert!(p.explanation.is_some());
    }

    #[test]
    fn top_categories_groups_by_quoted_identifier() {
        let cat = catalog(vec![col("product category", LogicalType::Text)]);
        let p = plan(AnalysisType::TopCategories, &cat, false);
        assert!(p.queries[0].sql.contains("\"product category\""));
        assert!(p.queries[0].sql.contains("LIMIT 20"));
    }

    #[test]
    fn trend_falls_back_without_a_date_column() {
        let p = plan(AnalysisType::Trend, &catalog(vec![col("amount", LogicalType::Double)]), false);
        assert_eq!(p.queries[0].name, "row_count");
    }

    #[test]
    fn trend_includes_metric_aggregates_when_available() {
        let cat = catalog(vec![
            col("order_date", LogicalType::Date),
            col("amount", LogicalType::Double),
        ]);
        let p = plan(AnalysisType::Trend, &cat, false);
        assert!(p.queries[0].sql.contains("SUM(\"amount\")"));
        assert!(p.queries[0].sql.contains("LIMIT 200"));
    }

    #[test]
    fn outliers_falls_back_without_numeric_columns() {
        let p = plan(AnalysisType::Outliers, &catalog(vec![col("name", LogicalType::Text)]), false);
        assert_eq!(p.queries[0].name, "row_count");
    }

    #[test]
    fn outliers_non_safe_mode_uses_z_score_and_row_numbers() {
        let cat = catalog(vec![col("amount", LogicalType::Double)]);
        let p = plan(AnalysisType::Outliers, &cat, false);
        assert!(p.queries[0].sql.contains("z_score"));
        assert!(p.queries[0].sql.contains("ROW_NUMBER()"));
        assert!(p.queries[0].sql.contains("LIMIT 200"));
    }

    #[test]
    fn outliers_safe_mode_aggregates_only() {
        let cat = catalog(vec![col("amount", LogicalType::Double)]);
        let p = plan(AnalysisType::Outliers, &cat, true);
        assert!(p.queries[0].sql.contains("COUNT(*) AS outlier_count"));
        assert!(!p.queries[0].sql.contains("z_score"));
    }

    #[test]
    fn data_quality_emits_null_counts_and_duplicate_check() {
        let cat = catalog(vec![col("amount", LogicalType::Double), col("name", LogicalType::Text)]);
        let p = plan(AnalysisType::DataQuality, &cat, false);
        assert_eq!(p.queries.len(), 2);
        assert_eq!(p.queries[0].name, "null_counts");
        assert_eq!(p.queries[1].name, "duplicate_check");
        assert!(p.queries[0].sql.contains("amount_nulls"));
    }

    #[test]
    fn no_template_ever_emits_select_star() {
        let cat = catalog(vec![
            col("order_date", LogicalType::Date),
            col("amount", LogicalType::Double),
            col("category", LogicalType::Text),
        ]);
        for analysis_type in AnalysisType::ALL {
            for safe_mode in [false, true] {
                let p = plan(analysis_type, &cat, safe_mode);
                for q in &p.queries {
                    assert!(!q.sql.to_uppercase().contains("SELECT *") || q.sql.contains("FROM ("));
                }
            }
        }
    }
}
