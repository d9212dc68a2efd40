//! Core data models for the charges predictor

use serde::{Deserialize, Serialize};

/// Name of the training target column
pub const TARGET_COLUMN: &str = "charges";

/// One applicant as read from the dataset or received in a request.
///
/// Categorical attributes stay as strings: the feature encoder is the one
/// place that decides whether a value belongs to its declared domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub age: i64,
    pub sex: String,
    pub bmi: f64,
    pub children: i64,
    pub smoker: String,
    pub region: String,
    /// Target value, present on training rows only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charges: Option<f64>,
}

impl RawRecord {
    /// Build an inference record (no target)
    pub fn new(
        age: i64,
        sex: impl Into<String>,
        bmi: f64,
        children: i64,
        smoker: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            age,
            sex: sex.into(),
            bmi,
            children,
            smoker: smoker.into(),
            region: region.into(),
            charges: None,
        }
    }

    pub fn with_charges(mut self, charges: f64) -> Self {
        self.charges = Some(charges);
        self
    }

    /// Value of a categorical attribute by column name
    pub fn categorical(&self, attribute: &str) -> Option<&str> {
        match attribute {
            "sex" => Some(&self.sex),
            "smoker" => Some(&self.smoker),
            "region" => Some(&self.region),
            _ => None,
        }
    }
}

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_charges: f64,
    pub model_version: String,
}

/// Holdout quality of a fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub r2: f64,
    pub rmse: f64,
    pub rows: usize,
}

impl EvaluationMetrics {
    /// Compute R² and RMSE of `predicted` against `actual`
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Option<Self> {
        if actual.is_empty() || actual.len() != predicted.len() {
            return None;
        }
        let n = actual.len() as f64;
        let mean = actual.iter().sum::<f64>() / n;
        let ss_res: f64 = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).powi(2))
            .sum();
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if ss_tot.abs() < f64::EPSILON {
            0.0
        } else {
            1.0 - ss_res / ss_tot
        };
        Some(Self {
            r2,
            rmse: (ss_res / n).sqrt(),
            rows: actual.len(),
        })
    }
}
