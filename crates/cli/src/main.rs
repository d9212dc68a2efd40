//! Insurance Charges Predictor CLI
//!
//! Trains the charges model, evaluates it on the seeded holdout, scores
//! single applicants and inspects the registered feature schema.

mod commands;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{evaluate, predict, schema, train};
use predictor_lib::{
    dataset::{DEFAULT_SPLIT_SEED, DEFAULT_TEST_SIZE},
    training::DEFAULT_DATA_PATH,
    ArtifactPaths, RawRecord, TrainingConfig,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Insurance Charges Predictor CLI
#[derive(Parser)]
#[command(name = "charges")]
#[command(author, version, about = "CLI for the Insurance Charges Predictor", long_about = None)]
pub struct Cli {
    /// Directory holding the model artifact and feature schema
    #[arg(long, global = true, env = "CHARGES_ARTIFACT_DIR", default_value = "models")]
    pub artifact_dir: PathBuf,

    /// Output format
    #[arg(long, short, global = true, env = "CHARGES_FORMAT", default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fit the model on the dataset and write both artifacts
    Train(DatasetArgs),

    /// Score the persisted model on the seeded holdout split
    Evaluate(DatasetArgs),

    /// Predict charges for a single applicant
    Predict(ApplicantArgs),

    /// Show the registered feature schema
    Schema,
}

/// Dataset location and split parameters
#[derive(Args)]
pub struct DatasetArgs {
    /// Training CSV
    #[arg(long, env = "CHARGES_DATA", default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Fraction of rows held out for evaluation
    #[arg(long, env = "CHARGES_TEST_SIZE", default_value_t = DEFAULT_TEST_SIZE)]
    pub test_size: f64,

    /// Seed of the train/test shuffle
    #[arg(long, env = "CHARGES_SEED", default_value_t = DEFAULT_SPLIT_SEED)]
    pub seed: u64,
}

/// One applicant's attributes
#[derive(Args)]
pub struct ApplicantArgs {
    #[arg(long)]
    pub age: i64,

    /// female or male
    #[arg(long)]
    pub sex: String,

    #[arg(long)]
    pub bmi: f64,

    #[arg(long)]
    pub children: i64,

    /// yes or no
    #[arg(long)]
    pub smoker: String,

    /// northeast, northwest, southeast or southwest
    #[arg(long)]
    pub region: String,
}

impl From<ApplicantArgs> for RawRecord {
    fn from(args: ApplicantArgs) -> Self {
        RawRecord::new(args.age, args.sex, args.bmi, args.children, args.smoker, args.region)
    }
}

impl DatasetArgs {
    fn into_config(self, paths: ArtifactPaths) -> TrainingConfig {
        TrainingConfig {
            data_path: self.data,
            artifacts: paths,
            test_size: self.test_size,
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays machine-readable
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let paths = ArtifactPaths::in_dir(&cli.artifact_dir);
    debug!(
        model = %paths.model.display(),
        schema = %paths.schema.display(),
        "Resolved artifact paths"
    );

    match cli.command {
        Commands::Train(args) => {
            train::run(&args.into_config(paths), cli.format)?;
        }
        Commands::Evaluate(args) => {
            evaluate::run(&args.into_config(paths), cli.format)?;
        }
        Commands::Predict(applicant) => {
            predict::run(paths, applicant.into(), cli.format)?;
        }
        Commands::Schema => {
            schema::run(&paths, cli.format)?;
        }
    }

    Ok(())
}
