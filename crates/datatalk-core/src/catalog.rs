//! Dataset and catalog types.
//!
//! A [`Dataset`] is a registry entry: a name, a source file, and a
//! status. A [`Catalog`] is the schema-plus-statistics snapshot produced
//! by ingestion; the core treats it as read-only input to the router's
//! column-detection helpers and the planner's SQL templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The format of a dataset's source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Csv,
    Excel,
    Parquet,
}

impl SourceType {
    /// Sniff a source type from a file extension; returns `None` for an
    /// unrecognized extension so the caller can fall back to content sniffing.
    pub fn from_extension(path: &str) -> Option<Self> {
        let ext = path.rsplit('.').next()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceType::Csv),
            "xlsx" | "xls" => Some(SourceType::Excel),
            "parquet" => Some(SourceType::Parquet),
            _ => None,
        }
    }
}

/// Lifecycle status of a registered dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetStatus {
    /// Registered but not yet (successfully) ingested; no catalog available.
    Registered,
    /// Ingestion completed; a `Catalog` is available.
    Ingested,
}

/// A registered dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub source_type: SourceType,
    pub status: DatasetStatus,
    pub created_at: DateTime<Utc>,
}

/// Logical column type as understood by the planner and router; a
/// coarser classification than the engine's native Arrow type, chosen so
/// that column-detection helpers don't need to know about Arrow at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Text,
    Integer,
    Double,
    Date,
    Boolean,
}

impl LogicalType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, LogicalType::Integer | LogicalType::Double)
    }

    pub fn is_date(&self) -> bool {
        matches!(self, LogicalType::Date)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, LogicalType::Text)
    }
}

/// Numeric summary statistics for a column, populated when ingestion
/// could compute them (never for non-numeric columns).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// One column's catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub stats: Option<ColumnStats>,
}

/// The schema-plus-statistics snapshot for an ingested dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub dataset_id: String,
    pub columns: Vec<ColumnMeta>,
}

impl Catalog {
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_source_type_case_insensitively() {
        assert_eq!(SourceType::from_extension("data.CSV"), Some(SourceType::Csv));
        assert_eq!(SourceType::from_extension("report.xlsx"), Some(SourceType::Excel));
        assert_eq!(SourceType::from_extension("big.parquet"), Some(SourceType::Parquet));
        assert_eq!(SourceType::from_extension("unknown.tsv"), None);
    }

    #[test]
    fn logical_type_classification() {
        assert!(LogicalType::Integer.is_numeric());
        assert!(LogicalType::Double.is_numeric());
        assert!(!LogicalType::Text.is_numeric());
        assert!(LogicalType::Date.is_date());
    }

    #[test]
    fn catalog_column_lookup() {
        let catalog = Catalog {
            dataset_id: "ds-1".into(),
            columns: vec![ColumnMeta {
                name: "amount".into(),
                logical_type: LogicalType::Double,
                nullable: true,
                stats: Some(ColumnStats {
                    mean: Some(10.0),
                    ..Default::default()
                }),
            }],
        };
        assert!(catalog.column("amount").is_some());
        assert!(catalog.column("missing").is_none());
    }
}
