//! Column-detection helpers: given a catalog, find the column the
//! planner should use for a given role. Each returns the first match in
//! catalog order, or `None`.

use datatalk_core::{Catalog, ColumnMeta};
use regex::Regex;
use std::sync::LazyLock;

static DATE_NAME_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(date|time|created|updated|order|event)").unwrap());
static CATEGORY_NAME_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(category|type|status|region|product|name|group|class)").unwrap()
});
static ID_NAME_HINT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)id").unwrap());

/// A column whose logical type is a date/timestamp, or whose name hints
/// at one (`date`, `time`, `created`, `updated`, `order`, `event`).
pub fn date_column(catalog: &Catalog) -> Option<&ColumnMeta> {
    catalog
        .columns
        .iter()
        .find(|c| c.logical_type.is_date() || DATE_NAME_HINT.is_match(&c.name))
}

/// A numeric column whose name does not contain "id".
pub fn metric_column(catalog: &Catalog) -> Option<&ColumnMeta> {
    catalog
        .columns
        .iter()
        .find(|c| c.logical_type.is_numeric() && !ID_NAME_HINT.is_match(&c.name))
}

/// A text column, preferring a name that hints at a category
/// (`category`, `type`, `status`, `region`, `product`, `name`, `group`,
/// `class`); falls back to the first text column otherwise.
pub fn best_categorical_column(catalog: &Catalog) -> Option<&ColumnMeta> {
    let hinted = catalog
        .columns
        .iter()
        .find(|c| c.logical_type.is_text() && CATEGORY_NAME_HINT.is_match(&c.name));
    hinted.or_else(|| catalog.columns.iter().find(|c| c.logical_type.is_text()))
}

/// Every numeric column excluding those whose name contains "id",
/// capped at the first 10 matches.
pub fn numeric_columns(catalog: &Catalog) -> Vec<&ColumnMeta> {
    catalog
        .columns
        .iter()
        .filter(|c| c.logical_type.is_numeric() && !ID_NAME_HINT.is_match(&c.name))
        .take(10)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatalk_core::{ColumnStats, LogicalType};

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
    fn date_column_prefers_logical_type_over_name() {
        let cat = catalog(vec![
            col("order_id", LogicalType::Integer),
            col("amount", LogicalType::Double),
            col("created_at", LogicalType::Date),
        ]);
        assert_eq!(date_column(&cat).unwrap().name, "created_at");
    }

    #[test]
    fn date_column_falls_back_to_name_hint() {
        let cat = catalog(vec![col("event_date", LogicalType::Text)]);
        assert_eq!(date_column(&cat).unwrap().name, "event_date");
    }

    #[test]
    fn metric_column_excludes_id_columns() {
        let cat = catalog(vec![
            col("customer_id", LogicalType::Integer),
            col("amount", LogicalType::Double),
        ]);
        assert_eq!(metric_column(&cat).unwrap().name, "amount");
    }

    #[test]
    fn best_categorical_column_prefers_hinted_name() {
        let cat = catalog(vec![
            col("description", LogicalType::Text),
            col("category", LogicalType::Text),
        ]);
        assert_eq!(best_categorical_column(&cat).unwrap().name, "category");
    }

    #[test]
    fn best_categorical_column_falls_back_to_first_text() {
        let cat = catalog(vec![col("description", LogicalType::Text)]);
        assert_eq!(best_categorical_column(&cat).unwrap().name, "description");
    }

    #[test]
    fn numeric_columns_caps_at_ten_and_skips_ids() {
        let mut columns: Vec<ColumnMeta> = (0..15)
            .map(|i| col(&format!("metric_{i}"), LogicalType::Double))
            .collect();
        columns.push(col("row_id", LogicalType::Integer));
        let cat = catalog(columns);
        let numeric = numeric_columns(&cat);
        assert_eq!(numeric.len(), 10);
        assert!(numeric.iter().all(|c| c.name != "row_id"));
    }

    #[test]
    fn stats_field_is_not_required_for_detection() {
        let cat = catalog(vec![ColumnMeta {
            name: "amount".to_string(),
            logical_type: LogicalType::Double,
            nullable: true,
            stats: Some(ColumnStats::default()),
        }]);
        assert!(metric_column(&cat).is_some());
    }
}
