//! One-shot prediction pipeline
//!
//! Each request walks `Idle → Loading → Encoding → Aligning → Predicted →
//! Done`; any stage may end in `Failed`. The only state carried between
//! requests is the artifact cache, and correctness never depends on which
//! cached pair a request happens to get.

use super::Predictor;
use crate::artifacts::ArtifactStore;
use crate::error::{PredictorError, Result};
use crate::features::FeatureEncoder;
use crate::models::{Prediction, RawRecord};
use crate::observability::{ServiceMetrics, StructuredLogger};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Progress of a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionStage {
    Idle,
    Loading,
    Encoding,
    Aligning,
    Predicted,
    Done,
}

impl fmt::Display for PredictionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PredictionStage::Idle => "idle",
            PredictionStage::Loading => "loading",
            PredictionStage::Encoding => "encoding",
            PredictionStage::Aligning => "aligning",
            PredictionStage::Predicted => "predicted",
            PredictionStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A prediction that ended in `Failed`, with the stage it failed in
#[derive(Debug)]
pub struct PredictionFailure {
    pub stage: PredictionStage,
    pub error: PredictorError,
}

impl fmt::Display for PredictionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (while {})", self.error, self.stage)
    }
}

impl std::error::Error for PredictionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<PredictionFailure> for PredictorError {
    fn from(failure: PredictionFailure) -> Self {
        failure.error
    }
}

/// Serves predictions from the artifacts published in an [`ArtifactStore`]
pub struct PredictionService {
    store: Arc<ArtifactStore>,
    encoder: FeatureEncoder,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self {
            store,
            encoder: FeatureEncoder::new(),
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::new("prediction_service"),
        }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Predict charges for one applicant
    pub fn predict(
        &self,
        record: &RawRecord,
    ) -> std::result::Result<Prediction, PredictionFailure> {
        let start = Instant::now();
        let result = self.run(record);
        let elapsed = start.elapsed();

        match &result {
            Ok(prediction) => {
                self.metrics.inc_predictions_served();
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.logger.log_prediction(
                    prediction.predicted_charges,
                    &prediction.model_version,
                    elapsed.as_micros(),
                );
            }
            Err(failure) => {
                let class = failure.error.class();
                self.metrics.inc_prediction_errors(class);
                self.logger.log_prediction_failure(
                    &failure.stage.to_string(),
                    class,
                    &failure.error.to_string(),
                );
            }
        }
        result
    }

    fn run(&self, record: &RawRecord) -> std::result::Result<Prediction, PredictionFailure> {
        let mut stage = PredictionStage::Idle;

        stage = advance(stage, PredictionStage::Loading);
        // One snapshot for the whole request: model and schema always match
        let artifacts = self.store.get().map_err(failed(stage))?;

        stage = advance(stage, PredictionStage::Encoding);
        let vector = self.encoder.encode_record(record).map_err(failed(stage))?;

        stage = advance(stage, PredictionStage::Aligning);
        let aligned = artifacts.schema.align(&vector);

        stage = advance(stage, PredictionStage::Predicted);
        let predicted = artifacts.model.predict(&aligned).map_err(failed(stage))?;
        if !predicted.is_finite() {
            return Err(failed(stage)(PredictorError::NonFinitePrediction(predicted)));
        }

        stage = advance(stage, PredictionStage::Done);
        debug_assert_eq!(stage, PredictionStage::Done);
        Ok(Prediction {
            predicted_charges: predicted,
            model_version: artifacts.model_version().to_string(),
        })
    }
}

fn failed(stage: PredictionStage) -> impl Fn(PredictorError) -> PredictionFailure {
    move |error| PredictionFailure { stage, error }
}

fn advance(from: PredictionStage, to: PredictionStage) -> PredictionStage {
    tracing::trace!(from = %from, to = %to, "Prediction stage");
    to
}

/// Convenience for callers that only care about the error
pub fn predict_one(service: &PredictionService, record: &RawRecord) -> Result<f64> {
    Ok(service.predict(record)?.predicted_charges)
}
