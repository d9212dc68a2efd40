//! Regression model, its persisted artifact and the serving pipeline

mod artifact;
mod linear;
mod service;

pub use artifact::{ModelArtifact, ModelStore, MODEL_FORMAT_VERSION};
pub use linear::LinearModel;
pub use service::{predict_one, PredictionFailure, PredictionService, PredictionStage};

use crate::error::Result;
use crate::features::AlignedVector;

/// Trait for regression implementations scoring aligned feature vectors
pub trait Predictor: Send + Sync {
    /// Predicted charges for one aligned vector
    fn predict(&self, features: &AlignedVector) -> Result<f64>;

    /// Number of features the model was fitted on
    fn num_features(&self) -> usize;

    /// Fingerprint of the schema the model's inputs must be aligned to
    fn schema_fingerprint(&self) -> &str;
}
