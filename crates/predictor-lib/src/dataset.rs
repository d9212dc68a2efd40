//! Insurance dataset loading
//!
//! Reads the training CSV, checks the fixed column set and fails fast on
//! anything unexpected. Also provides the seeded train/test split shared by
//! training and evaluation.

use crate::error::{PredictorError, Result};
use crate::models::{RawRecord, TARGET_COLUMN};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Columns the dataset must contain (extra columns are ignored)
pub const REQUIRED_COLUMNS: &[&str] = &[
    "age",
    "sex",
    "bmi",
    "children",
    "smoker",
    "region",
    TARGET_COLUMN,
];

/// Default fraction of rows held out for evaluation
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Default seed of the train/test shuffle
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// One CSV row; every column is mandatory
#[derive(Debug, Deserialize)]
struct CsvRow {
    age: i64,
    sex: String,
    bmi: f64,
    children: i64,
    smoker: String,
    region: String,
    charges: f64,
}

impl From<CsvRow> for RawRecord {
    fn from(row: CsvRow) -> Self {
        RawRecord::new(
            row.age,
            row.sex,
            row.bmi,
            row.children,
            row.smoker,
            row.region,
        )
        .with_charges(row.charges)
    }
}

/// Load and validate the insurance dataset from a CSV file
pub fn load_insurance_csv(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        PredictorError::SchemaValidation(format!(
            "cannot open dataset {}: {}",
            path.display(),
            e
        ))
    })?;
    let records = read_insurance_csv(file)?;
    info!(path = %path.display(), rows = records.len(), "Loaded dataset");
    Ok(records)
}

/// Parse the insurance dataset from any reader
pub fn read_insurance_csv<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PredictorError::SchemaValidation(format!("cannot read header: {}", e)))?
        .clone();

    let mut missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return Err(PredictorError::SchemaValidation(format!(
            "missing required columns: {:?}",
            missing
        )));
    }

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        // Line 1 is the header
        let row = row.map_err(|e| {
            PredictorError::SchemaValidation(format!("line {}: {}", index + 2, e))
        })?;
        records.push(RawRecord::from(row));
    }

    if records.is_empty() {
        return Err(PredictorError::SchemaValidation(
            "loaded dataset is empty".to_string(),
        ));
    }

    debug!(rows = records.len(), "Parsed dataset rows");
    Ok(records)
}

/// Shuffle with a fixed seed and split off `test_size` of the rows.
///
/// Returns `(train, test)`. The same inputs always produce the same split,
/// which is what lets evaluation score exactly the rows training held out.
pub fn train_test_split(
    records: &[RawRecord],
    test_size: f64,
    seed: u64,
) -> Result<(Vec<RawRecord>, Vec<RawRecord>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PredictorError::SchemaValidation(format!(
            "test size must be in (0, 1), got {}",
            test_size
        )));
    }

    let test_rows = (records.len() as f64 * test_size).ceil() as usize;
    if test_rows == 0 || test_rows >= records.len() {
        return Err(PredictorError::SchemaValidation(format!(
            "cannot split {} rows with test size {}",
            records.len(),
            test_size
        )));
    }

    let mut indices: Vec<usize> = (0..records.len()).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(test_rows);
    let pick = |idx: &[usize]| idx.iter().map(|&i| records[i].clone()).collect::<Vec<_>>();

    Ok((pick(train_idx), pick(test_idx)))
}

/// Split records into model inputs and targets
pub fn targets(records: &[RawRecord]) -> Result<Vec<f64>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            r.charges.ok_or_else(|| {
                PredictorError::SchemaValidation(format!(
                    "row {} has no '{}' value",
                    i, TARGET_COLUMN
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
age,sex,bmi,children,smoker,region,charges
19,female,27.9,0,yes,southwest,16884.924
18,male,33.77,1,no,southeast,1725.5523
28,male,33,3,no,southeast,4449.462
33,male,22.705,0,no,northwest,21984.47061
32,male,28.88,0,no,northwest,3866.8552
";

    fn sample_records(n: usize) -> Vec<RawRecord> {
        (0..n)
            .map(|i| {
                RawRecord::new(20 + (i % 40) as i64, "male", 25.0, 0, "no", "northeast")
                    .with_charges(i as f64)
            })
            .collect()
    }

    #[test]
    fn test_reads_valid_csv() {
        let records = read_insurance_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].age, 19);
        assert_eq!(records[0].region, "southwest");
        assert_eq!(records[2].bmi, 33.0);
        assert_eq!(records[4].charges, Some(3866.8552));
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let csv = "charges,region,smoker,children,bmi,sex,age,extra\n\
                   100.5,northeast,no,1,30.1,female,45,x\n";
        let records = read_insurance_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[0].age, 45);
        assert_eq!(records[0].charges, Some(100.5));
    }

    #[test]
    fn test_missing_columns_are_reported() {
        let csv = "age,sex,bmi,children,charges\n19,female,27.9,0,16884.924\n";
        let err = read_insurance_csv(csv.as_bytes()).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, PredictorError::SchemaValidation(_)));
        assert!(message.contains("region"));
        assert!(message.contains("smoker"));
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let csv = "age,sex,bmi,children,smoker,region,charges\n";
        let err = read_insurance_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_unparsable_cell_names_the_line() {
        let csv = "age,sex,bmi,children,smoker,region,charges\n\
                   19,female,27.9,0,yes,southwest,1.0\n\
                   old,male,30,0,no,northeast,2.0\n";
        let err = read_insurance_csv(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[test]
    fn test_missing_file() {
        let err = load_insurance_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PredictorError::SchemaValidation(_)));
    }

    #[test]
    fn test_split_is_deterministic() {
        let records = sample_records(50);
        let (train_a, test_a) = train_test_split(&records, 0.2, 42).unwrap();
        let (train_b, test_b) = train_test_split(&records, 0.2, 42).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 10);
        assert_eq!(train_a.len(), 40);
    }

    #[test]
    fn test_split_partitions_rows() {
        let records = sample_records(30);
        let (train, test) = train_test_split(&records, 0.2, 7).unwrap();
        let mut seen: Vec<f64> = train
            .iter()
            .chain(test.iter())
            .map(|r| r.charges.unwrap())
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..30).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_split_rejects_bad_sizes() {
        let records = sample_records(10);
        assert!(train_test_split(&records, 0.0, 42).is_err());
        assert!(train_test_split(&records, 1.0, 42).is_err());
        assert!(train_test_split(&records[..1], 0.2, 42).is_err());
    }

    #[test]
    fn test_targets_require_charges() {
        let mut records = sample_records(2);
        assert_eq!(targets(&records).unwrap(), vec![0.0, 1.0]);
        records[1].charges = None;
        assert!(targets(&records).is_err());
    }
}
