//! Schema registry
//!
//! Persists the ordered feature column list produced at training time so
//! the serving path can rebuild the exact model input layout without access
//! to the training data.

use crate::error::{PredictorError, Result};
use crate::features::FeatureSchema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Version of the on-disk schema document
pub const SCHEMA_FORMAT_VERSION: u32 = 1;

/// On-disk representation of a registered schema
#[derive(Debug, Serialize, Deserialize)]
struct SchemaDocument {
    format_version: u32,
    fingerprint: String,
    created_at: DateTime<Utc>,
    columns: FeatureSchema,
}

/// File-backed store for the canonical feature schema
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    path: PathBuf,
}

impl SchemaRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `schema`, replacing any previously registered one
    pub fn save(&self, schema: &FeatureSchema) -> Result<()> {
        let document = SchemaDocument {
            format_version: SCHEMA_FORMAT_VERSION,
            fingerprint: schema.fingerprint(),
            created_at: Utc::now(),
            columns: schema.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&document)?;
        write_atomic(&self.path, &bytes)?;

        info!(
            path = %self.path.display(),
            columns = schema.len(),
            fingerprint = %document.fingerprint,
            "Registered feature schema"
        );
        Ok(())
    }

    /// Load the registered schema
    pub fn load(&self) -> Result<FeatureSchema> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PredictorError::SchemaNotFound {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let document: SchemaDocument =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e.to_string()))?;

        if document.format_version != SCHEMA_FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {}",
                document.format_version
            )));
        }

        let fingerprint = document.columns.fingerprint();
        if fingerprint != document.fingerprint {
            return Err(self.corrupt(format!(
                "stored fingerprint {} does not match columns ({})",
                document.fingerprint, fingerprint
            )));
        }

        debug!(
            path = %self.path.display(),
            columns = document.columns.len(),
            "Loaded feature schema"
        );
        Ok(document.columns)
    }

    fn corrupt(&self, reason: String) -> PredictorError {
        PredictorError::CorruptArtifact {
            path: self.path.clone(),
            reason,
        }
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `bytes` to `path` through a uniquely named temp file and a rename.
///
/// Readers observe either the old file or the complete new one. Concurrent
/// writers each use their own temp file, so the last rename wins.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = (|| -> Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
