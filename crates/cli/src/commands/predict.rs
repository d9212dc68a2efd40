//! `charges predict`

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::{ArtifactPaths, ArtifactStore, PredictionService, RawRecord};
use std::sync::Arc;

use crate::output::{format_currency, print_json, OutputFormat};

/// Score one applicant against the persisted artifacts
pub fn run(paths: ArtifactPaths, record: RawRecord, format: OutputFormat) -> Result<()> {
    let service = PredictionService::new(Arc::new(ArtifactStore::new(paths)));
    let prediction = service
        .predict(&record)
        .context("Prediction failed")?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Predicted charges:".bold(),
                format_currency(prediction.predicted_charges).green().bold()
            );
            println!("Model version:      {}", prediction.model_version.dimmed());
        }
    }

    Ok(())
}
