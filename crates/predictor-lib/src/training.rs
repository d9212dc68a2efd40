//! Training orchestration
//!
//! Runs one end-to-end training job: load, split, encode, fit, persist the
//! model and its schema, then score the held-out rows through the same
//! encode → align → predict path the server uses.

use crate::artifacts::{ArtifactPaths, LoadedArtifacts};
use crate::dataset::{self, DEFAULT_SPLIT_SEED, DEFAULT_TEST_SIZE};
use crate::error::Result;
use crate::features::{FeatureEncoder, FeatureSchema};
use crate::models::{EvaluationMetrics, RawRecord};
use crate::observability::StructuredLogger;
use crate::predictor::{LinearModel, ModelArtifact, Predictor};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Default dataset location, relative to the working directory
pub const DEFAULT_DATA_PATH: &str = "data/insurance.csv";

/// Configuration for a training run
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub data_path: PathBuf,
    pub artifacts: ArtifactPaths,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed of the train/test shuffle
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            artifacts: ArtifactPaths::default(),
            test_size: DEFAULT_TEST_SIZE,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

/// Summary of a finished training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub model_version: String,
    pub model_path: PathBuf,
    pub schema_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
    pub columns: Vec<String>,
    pub schema_fingerprint: String,
    pub holdout: Option<EvaluationMetrics>,
}

/// Holdout evaluation of persisted artifacts
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub model_version: String,
    pub metrics: EvaluationMetrics,
}

/// Train on the configured dataset and persist both artifacts
pub fn train(config: &TrainingConfig) -> Result<TrainingReport> {
    let records = dataset::load_insurance_csv(&config.data_path)?;
    let (train_rows, test_rows) =
        dataset::train_test_split(&records, config.test_size, config.seed)?;

    let encoder = FeatureEncoder::new();
    let batch = encoder.encode_batch(&train_rows)?;
    let targets = dataset::targets(&train_rows)?;
    let model = LinearModel::fit(&batch, &targets)?;
    let schema = batch.schema().clone();

    let holdout = score(&encoder, &model, &schema, &test_rows)?;
    let artifact = ModelArtifact::from_model(&model, &schema.fingerprint(), train_rows.len())
        .with_holdout(Some(holdout));

    // Model first: until the schema lands, the pair's fingerprints disagree
    // and loaders refuse it instead of serving a mix
    config.artifacts.model_store().save(&artifact)?;
    config.artifacts.schema_registry().save(&schema)?;

    StructuredLogger::new("training").log_training_completed(
        &artifact.model_version,
        train_rows.len(),
        schema.len(),
        Some(holdout.r2),
        Some(holdout.rmse),
    );

    Ok(TrainingReport {
        model_version: artifact.model_version,
        model_path: config.artifacts.model.clone(),
        schema_path: config.artifacts.schema.clone(),
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
        columns: schema.columns().to_vec(),
        schema_fingerprint: schema.fingerprint(),
        holdout: Some(holdout),
    })
}

/// Re-create the training split and score the persisted model on its holdout
pub fn evaluate(config: &TrainingConfig) -> Result<EvaluationReport> {
    let artifacts = LoadedArtifacts::load(&config.artifacts)?;
    let records = dataset::load_insurance_csv(&config.data_path)?;
    let (_, test_rows) = dataset::train_test_split(&records, config.test_size, config.seed)?;

    let metrics = score(
        &FeatureEncoder::new(),
        &artifacts.model,
        &artifacts.schema,
        &test_rows,
    )?;
    info!(
        version = %artifacts.model_version(),
        r2 = metrics.r2,
        rmse = metrics.rmse,
        rows = metrics.rows,
        "Evaluated model on holdout"
    );

    Ok(EvaluationReport {
        model_version: artifacts.model_version().to_string(),
        metrics,
    })
}

/// Score rows one at a time exactly as the serving path would
fn score(
    encoder: &FeatureEncoder,
    model: &dyn Predictor,
    schema: &FeatureSchema,
    rows: &[RawRecord],
) -> Result<EvaluationMetrics> {
    let actual = dataset::targets(rows)?;
    let predicted = rows
        .iter()
        .map(|row| {
            let vector = encoder.encode_record(row)?;
            model.predict(&schema.align(&vector))
        })
        .collect::<Result<Vec<f64>>>()?;

    EvaluationMetrics::compute(&actual, &predicted).ok_or_else(|| {
        crate::error::PredictorError::Training("no holdout rows to evaluate".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactStore;
    use crate::error::PredictorError;
    use crate::predictor::{predict_one, PredictionService};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample_data() -> PathBuf {
        PathBuf::from(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../data/insurance_sample.csv"
        ))
    }

    fn config(dir: &TempDir) -> TrainingConfig {
        TrainingConfig {
            data_path: sample_data(),
            artifacts: ArtifactPaths::in_dir(dir.path()),
            ..Default::default()
        }
    }

    #[test]
    fn test_train_writes_matching_artifacts() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let report = train(&config).unwrap();

        assert_eq!(report.train_rows, 160);
        assert_eq!(report.test_rows, 40);
        assert_eq!(
            report.columns,
            FeatureEncoder::new().full_schema().columns().to_vec()
        );

        let loaded = LoadedArtifacts::load(&config.artifacts).unwrap();
        assert_eq!(loaded.schema.fingerprint(), report.schema_fingerprint);
        assert_eq!(loaded.model_version(), report.model_version);

        let holdout = report.holdout.unwrap();
        assert!(holdout.r2 > 0.9, "r2 was {}", holdout.r2);
        assert_eq!(holdout.rows, 40);
    }

    #[test]
    fn test_training_twice_registers_identical_schema() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let first = train(&config).unwrap();
        let second = train(&config).unwrap();
        assert_eq!(first.columns, second.columns);
        assert_eq!(first.schema_fingerprint, second.schema_fingerprint);
    }

    #[test]
    fn test_evaluate_reproduces_training_holdout() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let report = train(&config).unwrap();
        let evaluation = evaluate(&config).unwrap();

        let holdout = report.holdout.unwrap();
        assert_eq!(evaluation.model_version, report.model_version);
        assert!((evaluation.metrics.r2 - holdout.r2).abs() < 1e-9);
        assert!((evaluation.metrics.rmse - holdout.rmse).abs() < 1e-6);
    }

    #[test]
    fn test_evaluate_before_training() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            evaluate(&config(&dir)),
            Err(PredictorError::ArtifactMissing { .. })
        ));
    }

    #[test]
    fn test_end_to_end_smoker_costs_more() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        train(&config).unwrap();

        let store = Arc::new(ArtifactStore::new(config.artifacts.clone()));
        let service = PredictionService::new(store);
        let base = RawRecord::new(40, "male", 28.0, 2, "no", "northwest");
        let mut smoker = base.clone();
        smoker.smoker = "yes".to_string();

        let non_smoker_charges = predict_one(&service, &base).unwrap();
        let smoker_charges = predict_one(&service, &smoker).unwrap();

        assert!(non_smoker_charges.is_finite() && non_smoker_charges > 0.0);
        assert!(smoker_charges.is_finite() && smoker_charges > 0.0);
        assert_ne!(non_smoker_charges, smoker_charges);
        assert!(smoker_charges > non_smoker_charges);
    }

    /// Copy the sample dataset keeping only rows where `column` passes `keep`
    fn filtered_sample(dir: &TempDir, column: usize, keep: impl Fn(&str) -> bool) -> PathBuf {
        let content = std::fs::read_to_string(sample_data()).unwrap();
        let mut lines = content.lines();
        let mut csv = format!("{}\n", lines.next().unwrap());
        for line in lines.filter(|l| l.split(',').nth(column).is_some_and(&keep)) {
            csv.push_str(line);
            csv.push('\n');
        }
        let path = dir.path().join("filtered.csv");
        std::fs::write(&path, csv).unwrap();
        path
    }

    fn assert_training_refused(config: &TrainingConfig, attribute: &str, baseline: &str) {
        match train(config) {
            Err(PredictorError::Training(msg)) => {
                assert!(msg.contains(attribute) && msg.contains(baseline), "{}", msg);
            }
            other => panic!("expected a training error, got {:?}", other),
        }
        assert!(!config.artifacts.model.exists());
        assert!(!config.artifacts.schema.exists());
    }

    #[test]
    fn test_all_male_training_data_is_refused() {
        let dir = TempDir::new().unwrap();
        let config = TrainingConfig {
            data_path: filtered_sample(&dir, 1, |sex| sex == "male"),
            artifacts: ArtifactPaths::in_dir(dir.path().join("models")),
            ..Default::default()
        };
        assert_training_refused(&config, "sex", "female");
    }

    #[test]
    fn test_training_data_without_northeast_is_refused() {
        let dir = TempDir::new().unwrap();
        let config = TrainingConfig {
            data_path: filtered_sample(&dir, 5, |region| region != "northeast"),
            artifacts: ArtifactPaths::in_dir(dir.path().join("models")),
            ..Default::default()
        };
        assert_training_refused(&config, "region", "northeast");
    }

    #[test]
    fn test_bad_category_in_training_data_fails_fast() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("bad.csv");
        let mut csv = String::from("age,sex,bmi,children,smoker,region,charges\n");
        for i in 0..20 {
            csv.push_str(&format!(
                "{},{},{:.1},{},no,northeast,{}\n",
                20 + i,
                if i % 2 == 0 { "female" } else { "male" },
                20.0 + i as f64 * 0.7,
                i % 4,
                1000 + 37 * i
            ));
        }
        csv.push_str("40,male,30.0,1,no,mars,5000\n");
        std::fs::write(&data, csv).unwrap();

        let config = TrainingConfig {
            data_path: data,
            artifacts: ArtifactPaths::in_dir(dir.path().join("models")),
            ..Default::default()
        };
        assert!(matches!(
            train(&config),
            Err(PredictorError::UnknownCategory { .. })
        ));
        assert!(!config.artifacts.model.exists());
        assert!(!config.artifacts.schema.exists());
    }
}
