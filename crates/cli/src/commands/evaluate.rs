//! `charges evaluate`

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::{evaluate, TrainingConfig};

use crate::output::{
    color_r2, format_currency, print_header, print_json, print_warning, OutputFormat,
};

/// Below this R² the model explains little of the variance in charges
const WEAK_R2: f64 = 0.4;

/// Re-score the persisted model on the seeded holdout
pub fn run(config: &TrainingConfig, format: OutputFormat) -> Result<()> {
    let report = evaluate(config).context("Evaluation failed")?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_header("Holdout Evaluation");
            println!("Model version:          {}", report.model_version.cyan());
            println!("Holdout rows:           {}", report.metrics.rows);
            println!("R²:                     {}", color_r2(report.metrics.r2));
            println!("RMSE:                   {}", format_currency(report.metrics.rmse));

            if report.metrics.r2 < WEAK_R2 {
                println!();
                print_warning("Model explains less than 40% of the variance on the holdout");
            }
        }
    }

    Ok(())
}
