//! The query executor: one cached DataFusion `SessionContext` per
//! dataset, validated-query execution with a timeout and row cap, and the
//! CSV/Parquet/Excel ingestion needed to materialize table `data`.

use calamine::{open_workbook_auto, Data as CalamineValue, Reader};
use dashmap::DashMap;
use datafusion::arrow::array::Array;
use datafusion::arrow::datatypes::DataType as ArrowType;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use datatalk_core::{Catalog, Dataset, PlannedQuery, ResultTable, SourceType};
use serde_json::Value as JsonValue;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Default in-memory ingest bound (see `DATATALK_MAX_INGEST_BYTES`).
pub const DEFAULT_MAX_INGEST_BYTES: u64 = 512 * 1024 * 1024;
/// Row cap applied to planner-originated plans executed via `/chat`.
pub const L_EXEC: u64 = 200;
/// Row cap applied to client-authored queries on `/queries/execute`.
pub const L_MAX: u64 = datatalk_validator::L_MAX;

/// Typed execution failures; the caller maps these onto the shared error
/// taxonomy (`datatalk_core::ErrorKind`).
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("source file for dataset is not readable: {0}")]
    FileUnreadable(String),
    #[error("query rejected: {0}")]
    ValidationFailed(String),
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[error("engine error: {0}")]
    Engine(String),
}

impl From<ExecutionError> for datatalk_core::CoreError {
    fn from(err: ExecutionError) -> Self {
        use datatalk_core::{CoreError, ErrorKind};
        match err {
            ExecutionError::FileUnreadable(msg) => CoreError::file_unreadable(msg),
            ExecutionError::ValidationFailed(msg) => CoreError::validation_failed(msg),
            ExecutionError::Timeout(d) => {
                CoreError::new(ErrorKind::QueryTimeout, format!("timed out after {d:?}"))
            }
            ExecutionError::Engine(msg) => CoreError::engine_error(msg),
        }
    }
}

/// Owns the per-dataset DataFusion session cache. Entries are created
/// under a per-dataset lock (an `Arc<Mutex<...>>` stored behind a
/// `dashmap::Entry`) to avoid double-open races; never evicted in v1.
pub struct Executor {
    sessions: DashMap<String, Arc<Mutex<SessionContext>>>,
    max_ingest_bytes: u64,
    query_timeout: Duration,
}

impl Executor {
    pub fn new(max_ingest_bytes: u64, query_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_ingest_bytes,
            query_timeout,
        }
    }

    /// Run a plan's queries against `dataset`, applying Safe Mode
    /// validation and the given row cap (`L_EXEC` for planner plans,
    /// `L_MAX` for `/queries/execute`).
    pub async fn execute(
        &self,
        dataset: &Dataset,
        queries: &[PlannedQuery],
        safe_mode: bool,
        row_cap: u64,
    ) -> Result<Vec<ResultTable>, ExecutionError> {
        let session = self.session_for(dataset).await?;
        let guard = session.lock().await;

        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            let validated = datatalk_validator::validate(&query.sql, safe_mode, row_cap)
                .map_err(|rejection| ExecutionError::ValidationFailed(rejection.to_string()))?;
            let table = run_one(&guard, &query.name, &validated.sql, self.query_timeout).await?;
            results.push(table);
        }
        Ok(results)
    }

    /// Fetch (creating on first use) the cached session for `dataset`.
    async fn session_for(&self, dataset: &Dataset) -> Result<Arc<Mutex<SessionContext>>, ExecutionError> {
        if let Some(existing) = self.sessions.get(&dataset.id) {
            return Ok(existing.clone());
        }

        let ctx = build_session(dataset, self.max_ingest_bytes).await?;
        let entry = self
            .sessions
            .entry(dataset.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ctx)));
        Ok(entry.clone())
    }
}

async fn build_session(dataset: &Dataset, max_ingest_bytes: u64) -> Result<SessionContext, ExecutionError> {
    let ctx = SessionContext::new();
    match dataset.source_type {
        SourceType::Parquet => {
            ctx.register_parquet("data", &dataset.file_path, Default::default())
                .await
                .map_err(|e| ExecutionError::Engine(e.to_string()))?;
        }
        SourceType::Csv => {
            check_ingest_size(&dataset.file_path, max_ingest_bytes)?;
            ctx.register_csv("data", &dataset.file_path, CsvReadOptions::new())
                .await
                .map_err(|e| ExecutionError::Engine(e.to_string()))?;
        }
        SourceType::Excel => {
            check_ingest_size(&dataset.file_path, max_ingest_bytes)?;
            let csv_path = excel_to_csv_tempfile(&dataset.file_path)?;
            ctx.register_csv("data", csv_path.to_string_lossy().as_ref(), CsvReadOptions::new())
                .await
                .map_err(|e| ExecutionError::Engine(e.to_string()))?;
        }
    }
    Ok(ctx)
}

fn check_ingest_size(path: &str, max_ingest_bytes: u64) -> Result<(), ExecutionError> {
    let size = std::fs::metadata(path)
        .map_err(|e| ExecutionError::FileUnreadable(format!("{path}: {e}")))?
        .len();
    if size > max_ingest_bytes {
        return Err(ExecutionError::FileUnreadable(format!(
            "{path} is {size} bytes, over the {max_ingest_bytes}-byte ingest limit"
        )));
    }
    Ok(())
}

/// Convert the first worksheet of an Excel workbook to an in-memory CSV
/// stream, written to a temp file since DataFusion's CSV reader operates
/// on paths rather than in-memory buffers.
fn excel_to_csv_tempfile(path: &str) -> Result<std::path::PathBuf, ExecutionError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ExecutionError::FileUnreadable(format!("{path}: {e}")))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ExecutionError::FileUnreadable(format!("{path}: workbook has no worksheets")))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ExecutionError::FileUnreadable(format!("{path}: {e}")))?;

    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .map_err(|e| ExecutionError::Engine(e.to_string()))?;
    for row in range.rows() {
        let line = row
            .iter()
            .map(csv_escape)
            .collect::<Vec<_>>()
            .join(",");
        writeln!(file, "{line}").map_err(|e| ExecutionError::Engine(e.to_string()))?;
    }
    let (_, path) = file.keep().map_err(|e| ExecutionError::Engine(e.to_string()))?;
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

async fn run_one(
    session: &SessionContext,
    name: &str,
    sql: &str,
    timeout: Duration,
) -> Result<ResultTable, ExecutionError> {
    let run = async {
        let df = session
            .sql(sql)
            .await
            .map_err(|e| ExecutionError::Engine(e.to_string()))?;
        let schema = df.schema().clone();
        let batches = df
            .collect()
            .await
            .map_err(|e| ExecutionError::Engine(e.to_string()))?;
        let columns: Vec<String> = schema
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        let rows = batches_to_rows(&batches);
        Ok::<_, ExecutionError>(ResultTable {
            name: name.to_string(),
            row_count: rows.len(),
            columns,
            rows,
        })
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(result) => result,
        Err(_) => Err(ExecutionError::Timeout(timeout)),
    }
}

fn batches_to_rows(batches: &[RecordBatch]) -> Vec<Vec<JsonValue>> {
    let mut rows = Vec::new();
    for batch in batches {
        for row_idx in 0..batch.num_rows() {
            let mut row = Vec::with_capacity(batch.num_columns());
            for column in batch.columns() {
                row.push(arrow_value_to_json(column, row_idx));
            }
            rows.push(row);
        }
    }
    rows
}

/// Convert one Arrow array cell to a JSON value, covering the scalar
/// types the planner's templates ever produce. Anything else falls back
/// to its display form so a surprising engine type never panics here.
fn arrow_value_to_json(column: &Arc<dyn Array>, row: usize) -> JsonValue {
    use datafusion::arrow::array::*;

    if column.is_null(row) {
        return JsonValue::Null;
    }

    match column.data_type() {
        ArrowType::Boolean => JsonValue::Bool(column.as_any().downcast_ref::<BooleanArray>().unwrap().value(row)),
        ArrowType::Int8 | ArrowType::Int16 | ArrowType::Int32 => {
            JsonValue::from(column.as_any().downcast_ref::<Int32Array>().map(|a| a.value(row) as i64).unwrap_or_default())
        }
        ArrowType::Int64 => JsonValue::from(column.as_any().downcast_ref::<Int64Array>().unwrap().value(row)),
        ArrowType::UInt8 | ArrowType::UInt16 | ArrowType::UInt32 => {
            JsonValue::from(column.as_any().downcast_ref::<UInt32Array>().map(|a| a.value(row) as u64).unwrap_or_default())
        }
        ArrowType::UInt64 => JsonValue::from(column.as_any().downcast_ref::<UInt64Array>().unwrap().value(row)),
        ArrowType::Float32 => JsonValue::from(column.as_any().downcast_ref::<Float32Array>().unwrap().value(row) as f64),
        ArrowType::Float64 => JsonValue::from(column.as_any().downcast_ref::<Float64Array>().unwrap().value(row)),
        ArrowType::Utf8 => JsonValue::from(column.as_any().downcast_ref::<StringArray>().unwrap().value(row).to_string()),
        ArrowType::LargeUtf8 => JsonValue::from(column.as_any().downcast_ref::<LargeStringArray>().unwrap().value(row).to_string()),
        ArrowType::Date32 | ArrowType::Date64 | ArrowType::Timestamp(_, _) => {
            JsonValue::from(array_value_display(column, row))
        }
        _ => JsonValue::from(array_value_display(column, row)),
    }
}

fn array_value_display(column: &Arc<dyn Array>, row: usize) -> String {
    datafusion::arrow::util::display::array_value_to_string(column, row)
        .unwrap_or_else(|_| "null".to_string())
}

/// True when `catalog`'s columns look like they were produced from a
/// worksheet with at least one header cell (used by tests and the
/// registry to sanity-check ingestion output).
pub fn has_columns(catalog: &Catalog) -> bool {
    !catalog.columns.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use datatalk_core::{DatasetStatus, PlannedQuery};
    use std::io::Write as _;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{contents}").unwrap();
        file
    }

    fn dataset_for(path: &Path) -> Dataset {
        Dataset {
            id: "ds-test".to_string(),
            name: "test".to_string(),
            file_path: path.to_string_lossy().to_string(),
            source_type: SourceType::Csv,
            status: DatasetStatus::Ingested,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn executes_row_count_against_a_csv_file() {
        let file = write_csv("a,b\n1,2\n3,4\n5,6\n");
        let dataset = dataset_for(file.path());
        let executor = Executor::new(DEFAULT_MAX_INGEST_BYTES, Duration::from_secs(10));
        let queries = vec![PlannedQuery::new("row_count", "SELECT COUNT(*) AS row_count FROM data")];

        let results = executor.execute(&dataset, &queries, false, L_EXEC).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rows[0][0], JsonValue::from(3));
    }

    #[tokio::test]
    async fn rejects_unsafe_query_under_safe_mode() {
        let file = write_csv("a,b\n1,2\n");
        let dataset = dataset_for(file.path());
        let executor = Executor::new(DEFAULT_MAX_INGEST_BYTES, Duration::from_secs(10));
        let queries = vec![PlannedQuery::new("peek", "SELECT * FROM data")];

        let err = executor.execute(&dataset, &queries, true, L_EXEC).await.unwrap_err();
        assert!(matches!(err, ExecutionError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn refuses_to_ingest_a_file_over_the_size_bound() {
        let file = write_csv("a,b\n1,2\n");
        let dataset = dataset_for(file.path());
        let executor = Executor::new(1, Duration::from_secs(10));
        let queries = vec![PlannedQuery::new("row_count", "SELECT COUNT(*) AS row_count FROM data")];

        let err = executor.execute(&dataset, &queries, false, L_EXEC).await.unwrap_err();
        assert!(matches!(err, ExecutionError::FileUnreadable(_)));
    }

    #[tokio::test]
    async fn session_is_reused_across_queries() {
        let file = write_csv("a\n1\n2\n");
        let dataset = dataset_for(file.path());
        let executor = Executor::new(DEFAULT_MAX_INGEST_BYTES, Duration::from_secs(10));
        let queries = vec![
            PlannedQuery::new("row_count", "SELECT COUNT(*) AS row_count FROM data"),
            PlannedQuery::new("row_count_again", "SELECT COUNT(*) AS row_count FROM data"),
        ];
        let results = executor.execute(&dataset, &queries, false, L_EXEC).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
