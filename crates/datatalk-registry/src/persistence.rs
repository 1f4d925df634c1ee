//! Flat-file JSON persistence: `registry.json`, one `catalogs/<id>.json`
//! per ingested dataset, and `reports.json`. Each file is loaded whole on
//! read and rewritten whole on write; fine for the hundreds-of-datasets,
//! hundreds-of-reports scale this service targets, not a database.

use chrono::{DateTime, Utc};
use datatalk_core::{Catalog, Dataset};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("could not resolve an application data directory")]
    NoDataDir,
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A single saved analysis report, persisted alongside its originating
/// audit trail so `/reports/{id}` can replay exactly what was shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub dataset_id: String,
    pub dataset_name: String,
    pub conversation_id: String,
    pub question: Option<String>,
    pub message: String,
    pub tables: serde_json::Value,
    pub audit: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    datasets: Vec<Dataset>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReportsDocument {
    reports: Vec<Report>,
}

/// Resolves the on-disk locations this crate reads and writes.
///
/// Honors `DATATALK_DATA_DIR` as an override (useful for tests and for
/// running multiple instances side by side); otherwise defers to the
/// platform-conventional per-user application-data directory.
#[derive(Debug, Clone)]
pub struct RegistryPaths {
    root: PathBuf,
}

impl RegistryPaths {
    pub fn resolve() -> Result<Self, PersistenceError> {
        if let Ok(dir) = std::env::var("DATATALK_DATA_DIR") {
            return Ok(Self { root: PathBuf::from(dir) });
        }
        let dirs = ProjectDirs::from("com", "datatalk", "datatalk")
            .ok_or(PersistenceError::NoDataDir)?;
        Ok(Self {
            root: dirs.data_dir().to_path_buf(),
        })
    }

    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn registry_file(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    pub fn catalogs_dir(&self) -> PathBuf {
        self.root.join("catalogs")
    }

    pub fn catalog_file(&self, dataset_id: &str) -> PathBuf {
        self.catalogs_dir().join(format!("{dataset_id}.json"))
    }

    pub fn reports_file(&self) -> PathBuf {
        self.root.join("reports.json")
    }

    fn ensure_dirs(&self) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.root).map_err(|source| PersistenceError::Io {
            path: self.root.clone(),
            source,
        })?;
        std::fs::create_dir_all(self.catalogs_dir()).map_err(|source| PersistenceError::Io {
            path: self.catalogs_dir(),
            source,
        })
    }
}

fn read_json<T: Default + for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PersistenceError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let bytes = std::fs::read(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, bytes).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Thin read-modify-write wrapper over the three JSON documents, guarded
/// by a single mutex so concurrent requests never interleave a write.
pub struct Store {
    paths: RegistryPaths,
    lock: std::sync::Mutex<()>,
}

impl Store {
    pub fn new(paths: RegistryPaths) -> Result<Self, PersistenceError> {
        paths.ensure_dirs()?;
        Ok(Self {
            paths,
            lock: std::sync::Mutex::new(()),
        })
    }

    pub fn paths(&self) -> &RegistryPaths {
        &self.paths
    }

    pub fn list_datasets(&self) -> Result<Vec<Dataset>, PersistenceError> {
        let _guard = self.lock.lock().unwrap();
        let doc: RegistryDocument = read_json(&self.paths.registry_file())?;
        Ok(doc.datasets)
    }

    pub fn get_dataset(&self, dataset_id: &str) -> Result<Option<Dataset>, PersistenceError> {
        Ok(self
            .list_datasets()?
            .into_iter()
            .find(|d| d.id == dataset_id))
    }

    pub fn upsert_dataset(&self, dataset: Dataset) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().unwrap();
        let path = self.paths.registry_file();
        let mut doc: RegistryDocument = read_json(&path)?;
        match doc.datasets.iter_mut().find(|d| d.id == dataset.id) {
            Some(slot) => *slot = dataset,
            None => doc.datasets.push(dataset),
        }
        write_json(&path, &doc)
    }

    pub fn save_catalog(&self, catalog: &Catalog) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().unwrap();
        write_json(&self.paths.catalog_file(&catalog.dataset_id), catalog)
    }

    pub fn get_catalog(&self, dataset_id: &str) -> Result<Option<Catalog>, PersistenceError> {
        let _guard = self.lock.lock().unwrap();
        let path = self.paths.catalog_file(dataset_id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;
        let catalog = serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Json { path, source })?;
        Ok(Some(catalog))
    }

    pub fn save_report(&self, report: Report) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().unwrap();
        let path = self.paths.reports_file();
        let mut doc: ReportsDocument = read_json(&path)?;
        doc.reports.push(report);
        write_json(&path, &doc)
    }

    pub fn list_reports(&self) -> Result<Vec<Report>, PersistenceError> {
        let _guard = self.lock.lock().unwrap();
        let doc: ReportsDocument = read_json(&self.paths.reports_file())?;
        Ok(doc.reports)
    }

    pub fn get_report(&self, report_id: &str) -> Result<Option<Report>, PersistenceError> {
        Ok(self
            .list_reports()?
            .into_iter()
            .find(|r| r.id == report_id))
    }
}
