//! Trained artifact pair and its swappable in-memory handle
//!
//! A model is only meaningful together with the schema it was fitted
//! against. [`LoadedArtifacts`] is always a matched pair; [`ArtifactStore`]
//! publishes one pair at a time through an `ArcSwapOption`, so a reader
//! holding a snapshot never sees a model from one training run next to a
//! schema from another.

use crate::error::{PredictorError, Result};
use crate::features::FeatureSchema;
use crate::observability::ServiceMetrics;
use crate::predictor::{LinearModel, ModelArtifact, ModelStore};
use crate::registry::SchemaRegistry;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// File name of the model artifact inside the artifact directory
pub const MODEL_FILE: &str = "insurance_lr_model.json";

/// File name of the registered feature schema inside the artifact directory
pub const SCHEMA_FILE: &str = "feature_columns.json";

/// Default artifact directory, relative to the working directory
pub const DEFAULT_ARTIFACT_DIR: &str = "models";

/// Locations of the two artifacts written by one training run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub schema: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            schema: dir.join(SCHEMA_FILE),
        }
    }

    pub fn model_store(&self) -> ModelStore {
        ModelStore::new(&self.model)
    }

    pub fn schema_registry(&self) -> SchemaRegistry {
        SchemaRegistry::new(&self.schema)
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::in_dir(DEFAULT_ARTIFACT_DIR)
    }
}

/// A model and the schema it was trained against, verified to match
#[derive(Debug)]
pub struct LoadedArtifacts {
    pub model: LinearModel,
    pub schema: FeatureSchema,
    pub artifact: ModelArtifact,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedArtifacts {
    /// Load both artifacts and check that they belong to the same run
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let artifact = paths.model_store().load()?;
        let schema = paths.schema_registry().load()?;
        Self::from_parts(artifact, schema, &paths.model)
    }

    fn from_parts(
        artifact: ModelArtifact,
        schema: FeatureSchema,
        model_path: &Path,
    ) -> Result<Self> {
        let fingerprint = schema.fingerprint();
        if artifact.schema_fingerprint != fingerprint {
            return Err(PredictorError::ArtifactMismatch {
                model: artifact.schema_fingerprint,
                schema: fingerprint,
            });
        }
        if artifact.coefficients.len() != schema.len() {
            return Err(PredictorError::CorruptArtifact {
                path: model_path.to_path_buf(),
                reason: format!(
                    "{} coefficients for a {}-column schema",
                    artifact.coefficients.len(),
                    schema.len()
                ),
            });
        }

        Ok(Self {
            model: artifact.to_model(),
            schema,
            artifact,
            loaded_at: Utc::now(),
        })
    }

    pub fn model_version(&self) -> &str {
        &self.artifact.model_version
    }
}

/// Load-once, share-read handle on the active artifact pair
pub struct ArtifactStore {
    paths: ArtifactPaths,
    current: ArcSwapOption<LoadedArtifacts>,
    /// Serializes loads so concurrent first requests read the files once
    load_lock: Mutex<()>,
}

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            current: ArcSwapOption::empty(),
            load_lock: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Currently published pair, without touching the disk
    pub fn current(&self) -> Option<Arc<LoadedArtifacts>> {
        self.current.load_full()
    }

    /// Published pair, loading it from disk on first use
    pub fn get(&self) -> Result<Arc<LoadedArtifacts>> {
        if let Some(loaded) = self.current.load_full() {
            return Ok(loaded);
        }

        let _guard = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(loaded) = self.current.load_full() {
            return Ok(loaded);
        }
        self.load_and_publish()
    }

    /// Re-read both artifacts and swap them in as one unit.
    ///
    /// On failure the previously published pair stays active.
    pub fn reload(&self) -> Result<Arc<LoadedArtifacts>> {
        let _guard = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());
        let previous = self.current().map(|a| a.model_version().to_string());

        let result = self.load_and_publish();
        let metrics = ServiceMetrics::new();
        match &result {
            Ok(loaded) => {
                metrics.inc_reloads("success");
                info!(
                    previous = ?previous,
                    version = %loaded.model_version(),
                    "Artifacts reloaded"
                );
            }
            Err(e) => {
                metrics.inc_reloads("failure");
                warn!(
                    previous = ?previous,
                    error = %e,
                    "Artifact reload failed, keeping previous pair"
                );
            }
        }
        result
    }

    fn load_and_publish(&self) -> Result<Arc<LoadedArtifacts>> {
        let loaded = Arc::new(LoadedArtifacts::load(&self.paths)?);
        self.current.store(Some(Arc::clone(&loaded)));

        ServiceMetrics::new()
            .set_model_info(loaded.model_version(), &loaded.artifact.schema_fingerprint);
        info!(
            model = %self.paths.model.display(),
            schema = %self.paths.schema.display(),
            version = %loaded.model_version(),
            columns = loaded.schema.len(),
            "Artifacts loaded"
        );
        Ok(loaded)
    }
}
