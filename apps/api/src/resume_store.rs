//! File-backed resume data store. The retrieval core never touches storage;
//! handlers load and save through here and hand records to the engine.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::resume::ResumeRecord;

/// Top-level keys an admin update must carry.
pub const REQUIRED_SECTIONS: &[&str] = &["personal_info", "experience", "education", "skills", "projects"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid resume JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ResumeStore {
    path: PathBuf,
}

impl ResumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw JSON as stored, including presentation-only fields. `None` if the file does not exist.
    pub async fn load_raw(&self) -> Result<Option<Value>, StoreError> {
        let value = read_json_file(&self.path).await?;
        if value.is_none() {
            warn!("Resume data file not found: {}", self.path.display());
        }
        Ok(value)
    }

    pub async fn load(&self) -> Result<Option<ResumeRecord>, StoreError> {
        match self.load_raw().await? {
            Some(value) => parse_record(value)
                .map(Some)
                .map_err(|source| StoreError::Json {
                    path: self.path.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub async fn save_raw(&self, value: &Value) -> Result<(), StoreError> {
        write_json_file(&self.path, value).await?;
        info!("Resume data saved to {}", self.path.display());
        Ok(())
    }
}

/// Reads and parses a JSON file. A missing file is `Ok(None)`.
pub async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(io_error(path, source)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Writes pretty JSON to a sibling temp file, then renames it over the target,
/// so readers never see a partially written document.
pub async fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| io_error(path, source))?;
    }

    let body = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .map_err(|source| io_error(path, source))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn parse_record(value: Value) -> Result<ResumeRecord, serde_json::Error> {
    serde_json::from_value(value)
}

/// Returns the first required top-level section missing from `value`.
pub fn missing_required_section(value: &Value) -> Option<&'static str> {
    REQUIRED_SECTIONS
        .iter()
        .copied()
        .find(|section| value.get(section).is_none())
}
