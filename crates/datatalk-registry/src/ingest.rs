//! Catalog introspection: register a source file against a throwaway
//! DataFusion session and read back its schema plus per-column numeric
//! stats. Used once per dataset, at registration time; the executor's
//! own per-dataset session cache is a separate concern.

use calamine::{open_workbook_auto, Data as CalamineValue, Reader};
use datafusion::arrow::datatypes::{DataType as ArrowType, Schema};
use datafusion::prelude::{CsvReadOptions, SessionContext};
use datatalk_core::{Catalog, ColumnMeta, ColumnStats, LogicalType, SourceType};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("source file is not readable: {0}")]
    FileUnreadable(String),
    #[error("engine error during ingestion: {0}")]
    Engine(String),
}

/// Introspect `file_path` as `source_type` and return the schema-plus-stats
/// catalog for `dataset_id`. The session is dropped once this returns.
pub async fn introspect(
    dataset_id: &str,
    file_path: &str,
    source_type: SourceType,
) -> Result<Catalog, IngestError> {
    let ctx = SessionContext::new();
    match source_type {
        SourceType::Parquet => {
            ctx.register_parquet("data", file_path, Default::default())
                .await
                .map_err(|e| IngestError::Engine(e.to_string()))?;
        }
        SourceType::Csv => {
            ctx.register_csv("data", file_path, CsvReadOptions::new())
                .await
                .map_err(|e| IngestError::Engine(e.to_string()))?;
        }
        SourceType::Excel => {
            let csv_path = excel_to_csv_tempfile(file_path)?;
            ctx.register_csv("data", csv_path.to_string_lossy().as_ref(), CsvReadOptions::new())
                .await
                .map_err(|e| IngestError::Engine(e.to_string()))?;
        }
    }

    let df = ctx
        .table("data")
        .await
        .map_err(|e| IngestError::Engine(e.to_string()))?;
    let schema: Schema = df.schema().as_arrow().clone();

    let mut columns = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let logical_type = logical_type_of(field.data_type());
        let stats = if logical_type.is_numeric() {
            Some(numeric_stats(&ctx, field.name()).await?)
        } else {
            None
        };
        columns.push(ColumnMeta {
            name: field.name().to_string(),
            logical_type,
            nullable: field.is_nullable(),
            stats,
        });
    }

    Ok(Catalog {
        dataset_id: dataset_id.to_string(),
        columns,
    })
}

fn logical_type_of(data_type: &ArrowType) -> LogicalType {
    match data_type {
        ArrowType::Boolean => LogicalType::Boolean,
        ArrowType::Int8
        | ArrowType::Int16
        | ArrowType::Int32
        | ArrowType::Int64
        | ArrowType::UInt8
        | ArrowType::UInt16
        | ArrowType::UInt32
        | ArrowType::UInt64 => LogicalType::Integer,
        ArrowType::Float16 | ArrowType::Float32 | ArrowType::Float64 => LogicalType::Double,
        ArrowType::Date32 | ArrowType::Date64 | ArrowType::Timestamp(_, _) => LogicalType::Date,
        _ => LogicalType::Text,
    }
}

async fn numeric_stats(ctx: &SessionContext, column: &str) -> Result<ColumnStats, IngestError> {
    let quoted = datatalk_core::ident::quote_ident(column);
    let sql = format!(
        "SELECT AVG({quoted}) AS mean, STDDEV({quoted}) AS stddev, \
         MIN({quoted}) AS min_value, MAX({quoted}) AS max_value FROM data"
    );
    let df = ctx
        .sql(&sql)
        .await
        .map_err(|e| IngestError::Engine(e.to_string()))?;
    let batches = df
        .collect()
        .await
        .map_err(|e| IngestError::Engine(e.to_string()))?;

    let mut stats = ColumnStats::default();
    if let Some(batch) = batches.first() {
        if batch.num_rows() > 0 {
            stats.mean = column_f64(batch, 0);
            stats.stddev = column_f64(batch, 1);
            stats.min = column_f64(batch, 2);
            stats.max = column_f64(batch, 3);
        }
    }
    Ok(stats)
}

fn column_f64(batch: &datafusion::arrow::record_batch::RecordBatch, index: usize) -> Option<f64> {
    use datafusion::arrow::array::Float64Array;
    let column = batch.column(index);
    if column.is_empty() || column.is_null(0) {
        return None;
    }
    datafusion::arrow::compute::cast(column, &ArrowType::Float64)
        .ok()
        .and_then(|cast| cast.as_any().downcast_ref::<Float64Array>().map(|a| a.value(0)))
}

fn excel_to_csv_tempfile(path: &str) -> Result<PathBuf, IngestError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| IngestError::FileUnreadable(format!("{path}: {e}")))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::FileUnreadable(format!("{path}: workbook has no worksheets")))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IngestError::FileUnreadable(format!("{path}: {e}")))?;

    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .map_err(|e| IngestError::Engine(e.to_string()))?;
    for row in range.rows() {
        let line = row.iter().map(csv_escape).collect::<Vec<_>>().join(",");
        writeln!(file, "{line}").map_err(|e| IngestError::Engine(e.to_string()))?;
    }
    let (_, path) = file.keep().map_err(|e| IngestError::Engine(e.to_string()))?;
    Ok(path)
}

fn csv_escape(value: &CalamineValue) -> String {
    let text = match value {
        CalamineValue::Empty => String::new(),
        CalamineValue::String(s) => s.clone(),
        CalamineValue::Float(f) => f.to_string(),
        CalamineValue::Int(i) => i.to_string(),
        CalamineValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    if text.contains(',') || text.contains('"') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    #[tokio::test]
    async fn introspects_schema_and_numeric_stats() {
        let file = write_csv("name,amount\nalice,10\nbob,20\ncarol,30\n");
        let catalog = introspect("ds-1", file.path().to_str().unwrap(), SourceType::Csv)
            .await
            .unwrap();

        assert_eq!(catalog.columns.len(), 2);
        let amount = catalog.column("amount").unwrap();
        assert_eq!(amount.logical_type, LogicalType::Integer);
        let stats = amount.stats.unwrap();
        assert_eq!(stats.mean, Some(20.0));
        assert_eq!(stats.min, Some(10.0));
        assert_eq!(stats.max, Some(30.0));

        let name = catalog.column("name").unwrap();
        assert_eq!(name.logical_type, LogicalType::Text);
        assert!(name.stats.is_none());
    }

    #[tokio::test]
    async fn reports_file_unreadable_for_a_missing_file() {
        let err = introspect("ds-1", "/no/such/file.csv", SourceType::Csv)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Engine(_)) || matches!(err, IngestError::FileUnreadable(_)));
    }
}
