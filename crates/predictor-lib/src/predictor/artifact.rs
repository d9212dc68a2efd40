//! Persisted model artifact

use super::LinearModel;
use crate::error::{PredictorError, Result};
use crate::models::EvaluationMetrics;
use crate::registry::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Version of the on-disk model document
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Fitted parameters plus the metadata binding them to a feature schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_version: String,
    pub trained_at: DateTime<Utc>,
    /// Fingerprint of the feature schema the coefficients are ordered by
    pub schema_fingerprint: String,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub train_rows: usize,
    #[serde(default)]
    pub holdout: Option<EvaluationMetrics>,
}

impl ModelArtifact {
    pub fn from_model(model: &LinearModel, schema_fingerprint: &str, train_rows: usize) -> Self {
        let trained_at = Utc::now();
        Self {
            format_version: MODEL_FORMAT_VERSION,
            model_version: model_version(&trained_at, schema_fingerprint),
            trained_at,
            schema_fingerprint: schema_fingerprint.to_string(),
            intercept: model.intercept(),
            coefficients: model.coefficients().to_vec(),
            train_rows,
            holdout: None,
        }
    }

    pub fn with_holdout(mut self, metrics: Option<EvaluationMetrics>) -> Self {
        self.holdout = metrics;
        self
    }

    pub fn to_model(&self) -> LinearModel {
        LinearModel::from_parts(
            self.intercept,
            self.coefficients.clone(),
            self.schema_fingerprint.clone(),
        )
    }
}

/// `lr-<timestamp>-<fingerprint prefix>`
fn model_version(trained_at: &DateTime<Utc>, schema_fingerprint: &str) -> String {
    let prefix: String = schema_fingerprint.chars().take(8).collect();
    format!("lr-{}-{}", trained_at.format("%Y%m%dT%H%M%SZ"), prefix)
}

/// File-backed store for the model artifact
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(artifact)?;
        write_atomic(&self.path, &bytes)?;
        info!(
            path = %self.path.display(),
            version = %artifact.model_version,
            "Saved model artifact"
        );
        Ok(())
    }

    pub fn load(&self) -> Result<ModelArtifact> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PredictorError::ArtifactMissing {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e.to_string()))?;

        if artifact.format_version != MODEL_FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {}",
                artifact.format_version
            )));
        }
        if !artifact.intercept.is_finite() || artifact.coefficients.iter().any(|c| !c.is_finite())
        {
            return Err(self.corrupt("non-finite parameters".to_string()));
        }

        debug!(
            path = %self.path.display(),
            version = %artifact.model_version,
            "Loaded model artifact"
        );
        Ok(artifact)
    }

    fn corrupt(&self, reason: String) -> PredictorError {
        PredictorError::CorruptArtifact {
            path: self.path.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact() -> ModelArtifact {
        let model = LinearModel::from_parts(
            -1200.5,
            vec![250.0, 320.0, 23800.0],
            "ab12cd34ef".to_string(),
        );
        ModelArtifact::from_model(&model, "ab12cd34ef", 160).with_holdout(Some(EvaluationMetrics {
            r2: 0.97,
            rmse: 540.0,
            rows: 40,
        }))
    }

    #[test]
    fn test_model_version_format() {
        let a = artifact();
        assert!(a.model_version.starts_with("lr-"));
        assert!(a.model_version.ends_with("-ab12cd34"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("insurance_lr_model.json"));
        let a = artifact();
        store.save(&a).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, a);
        assert_eq!(loaded.to_model().coefficients(), &[250.0, 320.0, 23800.0]);
    }

    #[test]
    fn test_missing_model_is_artifact_missing() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("insurance_lr_model.json"));
        assert!(matches!(
            store.load(),
            Err(PredictorError::ArtifactMissing { .. })
        ));
    }

    #[test]
    fn test_unsupported_version_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("insurance_lr_model.json"));
        let mut a = artifact();
        a.format_version = 99;
        store.save(&a).unwrap();
        assert!(matches!(
            store.load(),
            Err(PredictorError::CorruptArtifact { .. })
        ));
    }
}
