//! `charges train`

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::{train, TrainingConfig};

use crate::output::{
    color_r2, format_currency, print_header, print_info, print_json, print_success, OutputFormat,
};

/// Train the model and print a summary of the run
pub fn run(config: &TrainingConfig, format: OutputFormat) -> Result<()> {
    let report = train(config).with_context(|| {
        format!("Training on {} failed", config.data_path.display())
    })?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_header("Training Summary");
            println!("Model version:          {}", report.model_version.cyan());
            println!("Training rows:          {}", report.train_rows);
            println!("Holdout rows:           {}", report.test_rows);
            println!("Feature columns:        {}", report.columns.len());
            println!("Schema fingerprint:     {}", report.schema_fingerprint.dimmed());
            println!();

            if let Some(holdout) = report.holdout {
                println!("{}", "Holdout".bold());
                println!("{}", "-".repeat(50));
                println!("R²:                     {}", color_r2(holdout.r2));
                println!("RMSE:                   {}", format_currency(holdout.rmse));
                println!();
            }

            print_success(&format!("Model written to {}", report.model_path.display()));
            print_success(&format!("Schema written to {}", report.schema_path.display()));
            print_info("Run `charges predict --help` to score an applicant");
        }
    }

    Ok(())
}
