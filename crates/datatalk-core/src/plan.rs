//! Query plans and result sets.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One named SQL statement in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedQuery {
    pub name: String,
    pub sql: String,
}

impl PlannedQuery {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// The executed result of one planned query.
///
/// `row_count` may exceed `rows.len()` when the executor truncated the
/// materialized rows to the row cap but the engine reported a larger
/// logical count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
}

impl ResultTable {
    /// The count the summarizer should treat as authoritative: `row_count`
    /// when present and larger than the materialized rows, per the
    /// boundary behavior "result with rowCount larger than len(rows):
    /// summarizer uses rowCount".
    pub fn effective_row_count(&self) -> usize {
        self.row_count.max(self.rows.len())
    }

    /// Look up a column by case-insensitive name, returning its index.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn effective_row_count_prefers_the_larger_value() {
        let table = ResultTable {
            name: "row_count".into(),
            columns: vec!["row_count".into()],
            rows: vec![vec![json!(1748)]],
            row_count: 1,
        };
        assert_eq!(table.effective_row_count(), 1);

        let truncated = ResultTable {
            name: "outliers_detected".into(),
            columns: vec!["value".into()],
            rows: vec![vec![json!(1.0)]; 50],
            row_count: 400,
        };
        assert_eq!(truncated.effective_row_count(), 400);
    }

    #[test]
    fn column_index_is_case_insensitive() {
        let table = ResultTable {
            name: "t".into(),
            columns: vec!["Row_Count".into()],
            rows: vec![],
            row_count: 0,
        };
        assert_eq!(table.column_index("row_count"), Some(0));
        assert_eq!(table.column_index("missing"), None);
    }
}
