//! Dataset registration, ingestion, and file-backed persistence, plus
//! the Privacy Mode column redactor.
//!
//! This crate owns everything that survives between requests and
//! between process restarts: the dataset registry, per-dataset
//! catalogs, and saved reports. Query execution itself (the cached
//! per-dataset session, actually running SQL) lives in the executor
//! crate; registration runs its own throwaway introspection session
//! once, at registration time, since schema-plus-stats discovery and
//! repeated query execution are different enough concerns to not share
//! a session cache.

pub mod ingest;
pub mod persistence;
pub mod redact;

use chrono::Utc;
use datatalk_core::ident::validate_dataset_name;
use datatalk_core::{Catalog, CoreError, Dataset, DatasetStatus, ErrorKind, SourceType};
use persistence::{PersistenceError, RegistryPaths, Report, Store};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<RegistryError> for CoreError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Core(core) => core,
            RegistryError::Persistence(persist) => {
                CoreError::new(ErrorKind::EngineError, persist.to_string())
            }
        }
    }
}

/// The dataset/catalog/report collaborator behind `/datasets` and
/// `/reports`. One instance per process, shared behind an `Arc` by the
/// HTTP layer; internal mutation goes through `persistence::Store`'s own
/// lock, so this type itself holds no interior mutability of its own.
pub struct Registry {
    store: Store,
}

impl Registry {
    /// Open the registry at the platform-conventional application-data
    /// directory (or `DATATALK_DATA_DIR`, if set).
    pub fn open() -> Result<Self, RegistryError> {
        let paths = RegistryPaths::resolve().map_err(RegistryError::Persistence)?;
        Self::open_at(paths)
    }

    pub fn open_at(paths: RegistryPaths) -> Result<Self, RegistryError> {
        let store = Store::new(paths)?;
        Ok(Self { store })
    }

    /// Register `name` as a new dataset reading from `file_path`, then
    /// ingest it synchronously. Ingestion failure is not fatal to
    /// registration: the dataset is saved as `registered` with no
    /// catalog, matching the lifecycle in which a later retry of
    /// ingestion is always possible, just not implemented as a
    /// background job here (there is no job queue; this is a
    /// single-user local service with one request in flight at a time
    /// per dataset).
    pub async fn register(
        &self,
        name: &str,
        file_path: &str,
        source_type: Option<SourceType>,
    ) -> Result<Dataset, RegistryError> {
        validate_dataset_name(name).map_err(RegistryError::Core)?;
        datatalk_core::ident::validate_file_path(file_path).map_err(RegistryError::Core)?;

        let source_type = source_type
            .or_else(|| SourceType::from_extension(file_path))
            .ok_or_else(|| {
                RegistryError::Core(CoreError::file_unreadable(format!(
                    "could not determine a source type for '{file_path}'; pass sourceType explicitly"
                )))
            })?;

        let dataset_id = format!("ds-{}", Uuid::new_v4());
        let mut dataset = Dataset {
            id: dataset_id.clone(),
            name: name.to_string(),
            file_path: file_path.to_string(),
            source_type,
            status: DatasetStatus::Registered,
            created_at: Utc::now(),
        };
        self.store.upsert_dataset(dataset.clone())?;

        match ingest::introspect(&dataset_id, file_path, source_type).await {
            Ok(catalog) => {
                self.store.save_catalog(&catalog)?;
                dataset.status = DatasetStatus::Ingested;
                self.store.upsert_dataset(dataset.clone())?;
            }
            Err(err) => {
                tracing::warn!(dataset_id = %dataset_id, error = %err, "ingestion failed at registration");
            }
        }

        Ok(dataset)
    }

    pub fn list_datasets(&self) -> Result<Vec<Dataset>, RegistryError> {
        Ok(self.store.list_datasets()?)
    }

    pub fn get_dataset(&self, dataset_id: &str) -> Result<Dataset, RegistryError> {
        self.store
            .get_dataset(dataset_id)?
            .ok_or_else(|| RegistryError::Core(CoreError::dataset_not_found(dataset_id)))
    }

    /// Fetch a dataset's catalog, applying Privacy Mode redaction when
    /// `privacy_mode` is set. Returns `file_unreadable` when the dataset
    /// is registered but has no catalog yet (ingestion never succeeded).
    pub fn get_catalog(&self, dataset_id: &str, privacy_mode: bool) -> Result<Catalog, RegistryError> {
        let catalog = self.store.get_catalog(dataset_id)?.ok_or_else(|| {
            RegistryError::Core(CoreError::file_unreadable(format!(
                "dataset '{dataset_id}' has not been successfully ingested"
            )))
        })?;
        Ok(if privacy_mode {
            redact::redact(&catalog)
        } else {
            catalog
        })
    }

    /// Retry ingestion for a dataset stuck in `registered`. Returns the
    /// updated dataset regardless of outcome; callers inspect `status`.
    pub async fn reingest(&self, dataset_id: &str) -> Result<Dataset, RegistryError> {
        let mut dataset = self.get_dataset(dataset_id)?;
        let catalog = ingest::introspect(&dataset.id, &dataset.file_path, dataset.source_type)
            .await
            .map_err(|e| RegistryError::Core(CoreError::file_unreadable(e.to_string())))?;
        self.store.save_catalog(&catalog)?;
        dataset.status = DatasetStatus::Ingested;
        self.store.upsert_dataset(dataset.clone())?;
        Ok(dataset)
    }

    pub fn save_report(&self, report: Report) -> Result<(), RegistryError> {
        Ok(self.store.save_report(report)?)
    }

    pub fn list_reports(&self) -> Result<Vec<Report>, RegistryError> {
        Ok(self.store.list_reports()?)
    }

    pub fn get_report(&self, report_id: &str) -> Result<Report, RegistryError> {
        self.store
            .get_report(report_id)?
            .ok_or_else(|| RegistryError::Core(CoreError::new(
                ErrorKind::DatasetNotFound,
                format!("report '{report_id}' does not exist"),
            )))
    }
}
