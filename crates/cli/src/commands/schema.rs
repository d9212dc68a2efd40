//! `charges schema`

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::ArtifactPaths;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_header, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct ColumnRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Column")]
    name: String,
}

#[derive(Serialize)]
struct SchemaView<'a> {
    path: String,
    fingerprint: String,
    columns: &'a [String],
}

/// Print the registered feature schema
pub fn run(paths: &ArtifactPaths, format: OutputFormat) -> Result<()> {
    let registry = paths.schema_registry();
    let schema = registry
        .load()
        .context("Failed to load the registered feature schema")?;

    match format {
        OutputFormat::Json => print_json(&SchemaView {
            path: registry.path().display().to_string(),
            fingerprint: schema.fingerprint(),
            columns: schema.columns(),
        })?,
        OutputFormat::Table => {
            print_header("Feature Schema");
            println!("Path:                   {}", registry.path().display());
            println!("Fingerprint:            {}", schema.fingerprint().dimmed());
            println!();

            let rows: Vec<ColumnRow> = schema
                .columns()
                .iter()
                .enumerate()
                .map(|(index, name)| ColumnRow {
                    index,
                    name: name.clone(),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}
