//! Ordinary least squares regression over encoded features
//!
//! Fitting is delegated to `linfa-linear`; the fitted parameters are kept
//! as plain vectors bound to the fingerprint of the schema they were
//! fitted against.

use super::Predictor;
use crate::error::{PredictorError, Result};
use crate::features::{AlignedVector, EncodedBatch, CATEGORICAL_FEATURES};
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use tracing::debug;

/// Fitted linear model: `charges = intercept + coefficients · x`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
    schema_fingerprint: String,
}

impl LinearModel {
    /// Fit an OLS model with intercept on an encoded batch
    pub fn fit(batch: &EncodedBatch, targets: &[f64]) -> Result<Self> {
        let rows = batch.len();
        let features = batch.schema().len();

        if rows != targets.len() {
            return Err(PredictorError::Training(format!(
                "{} feature rows but {} targets",
                rows,
                targets.len()
            )));
        }
        if rows <= features {
            return Err(PredictorError::Training(format!(
                "need more rows than features to fit ({} rows, {} features)",
                rows, features
            )));
        }
        if targets.iter().any(|t| !t.is_finite()) {
            return Err(PredictorError::Training(
                "targets contain non-finite values".to_string(),
            ));
        }
        check_identifiable(batch)?;

        let flat: Vec<f64> = batch.rows().iter().flatten().copied().collect();
        let records = Array2::from_shape_vec((rows, features), flat)
            .map_err(|e| PredictorError::Training(format!("feature matrix: {}", e)))?;
        let dataset = Dataset::new(records, Array1::from_vec(targets.to_vec()));

        let fitted = LinearRegression::new()
            .fit(&dataset)
            .map_err(|e| PredictorError::Training(e.to_string()))?;

        let model = Self {
            intercept: fitted.intercept(),
            coefficients: fitted.params().to_vec(),
            schema_fingerprint: batch.schema().fingerprint(),
        };

        if !model.intercept.is_finite() || model.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictorError::Training(
                "fit produced non-finite parameters (collinear features?)".to_string(),
            ));
        }

        debug!(
            rows,
            features,
            intercept = model.intercept,
            "Fitted linear model"
        );
        Ok(model)
    }

    /// Rebuild a model from persisted parameters
    pub fn from_parts(intercept: f64, coefficients: Vec<f64>, schema_fingerprint: String) -> Self {
        Self {
            intercept,
            coefficients,
            schema_fingerprint,
        }
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

/// Reject design matrices whose columns are collinear with the intercept.
///
/// A categorical attribute whose baseline never occurs has indicators that
/// sum to one on every row, and a constant column duplicates the intercept.
/// Either way OLS has no unique solution.
fn check_identifiable(batch: &EncodedBatch) -> Result<()> {
    let schema = batch.schema();
    let rows = batch.rows();

    for feature in CATEGORICAL_FEATURES {
        let group: Vec<usize> = feature
            .indicator_names()
            .filter_map(|name| schema.position(&name))
            .collect();
        if group.is_empty() {
            continue;
        }
        let baseline_seen = rows.iter().any(|row| group.iter().all(|&i| row[i] == 0.0));
        if !baseline_seen {
            return Err(PredictorError::Training(format!(
                "training data has no '{}' rows for '{}'; the baseline category must occur",
                feature.baseline(),
                feature.name
            )));
        }
    }

    if let Some(first) = rows.first() {
        for (index, column) in schema.columns().iter().enumerate() {
            if rows.iter().all(|row| row[index] == first[index]) {
                return Err(PredictorError::Training(format!(
                    "feature '{}' is constant ({}) across the training data",
                    column, first[index]
                )));
            }
        }
    }

    Ok(())
}

impl Predictor for LinearModel {
    fn predict(&self, features: &AlignedVector) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(PredictorError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }
        if features.schema_fingerprint() != self.schema_fingerprint {
            return Err(PredictorError::SchemaMismatch {
                expected: self.schema_fingerprint.clone(),
                actual: features.schema_fingerprint().to_string(),
            });
        }

        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(features.values())
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }

    fn num_features(&self) -> usize {
        self.coefficients.len()
    }

    fn schema_fingerprint(&self) -> &str {
        &self.schema_fingerprint
    }
}
