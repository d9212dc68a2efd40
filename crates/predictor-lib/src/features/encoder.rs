//! One-hot feature encoder
//!
//! Numeric attributes pass through unchanged. Each categorical attribute
//! contributes one indicator field per non-baseline category *observed in
//! the batch*, so a single-row batch yields fewer fields than a full
//! training table. Serving code must therefore align its vectors to the
//! registered schema instead of trusting its own field set.

use super::schema::{FeatureSchema, FeatureVector};
use super::{CategoricalFeature, CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use crate::error::{PredictorError, Result};
use crate::models::RawRecord;
use tracing::debug;

/// Column plan entry: where a feature value comes from
#[derive(Debug, Clone, Copy)]
enum Column {
    Numeric(usize),
    Indicator { feature: usize, category: usize },
}

/// Encoded batch: one schema shared by all rows
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    schema: FeatureSchema,
    rows: Vec<Vec<f64>>,
}

impl EncodedBatch {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Row-major values, each row in schema order
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Named view of a single row
    pub fn row_vector(&self, index: usize) -> Option<FeatureVector> {
        self.rows.get(index).map(|row| {
            FeatureVector::new(
                self.schema
                    .columns()
                    .iter()
                    .cloned()
                    .zip(row.iter().copied())
                    .collect(),
            )
        })
    }
}

/// Converts raw records into numeric feature vectors
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Schema produced when every declared category is present
    pub fn full_schema(&self) -> FeatureSchema {
        let columns = NUMERIC_FEATURES
            .iter()
            .map(|f| f.name.to_string())
            .chain(CATEGORICAL_FEATURES.iter().flat_map(|f| f.indicator_names()))
            .collect();
        FeatureSchema::from_unique(columns)
    }

    /// Encode a batch of records.
    ///
    /// Any invalid record fails the whole batch; no partial output is
    /// produced.
    pub fn encode_batch(&self, records: &[RawRecord]) -> Result<EncodedBatch> {
        if records.is_empty() {
            return Err(PredictorError::SchemaValidation(
                "cannot encode an empty batch".to_string(),
            ));
        }

        let categories = records
            .iter()
            .map(validate_record)
            .collect::<Result<Vec<_>>>()?;

        let mut observed: Vec<Vec<bool>> = CATEGORICAL_FEATURES
            .iter()
            .map(|f| vec![false; f.categories.len()])
            .collect();
        for positions in &categories {
            for (feature, &category) in positions.iter().enumerate() {
                observed[feature][category] = true;
            }
        }

        let plan: Vec<Column> = (0..NUMERIC_FEATURES.len())
            .map(Column::Numeric)
            .chain(
                CATEGORICAL_FEATURES
                    .iter()
                    .enumerate()
                    .flat_map(|(feature, declared)| {
                        (1..declared.categories.len()).map(move |category| Column::Indicator {
                            feature,
                            category,
                        })
                    })
                    .filter(|column| match column {
                        Column::Indicator { feature, category } => observed[*feature][*category],
                        Column::Numeric(_) => true,
                    }),
            )
            .collect();

        let columns = plan
            .iter()
            .map(|column| match *column {
                Column::Numeric(index) => NUMERIC_FEATURES[index].name.to_string(),
                Column::Indicator { feature, category } => {
                    let declared = &CATEGORICAL_FEATURES[feature];
                    declared.indicator_name(declared.categories[category])
                }
            })
            .collect();
        let schema = FeatureSchema::from_unique(columns);

        let rows = records
            .iter()
            .zip(&categories)
            .map(|(record, positions)| {
                plan.iter()
                    .map(|column| match *column {
                        Column::Numeric(index) => NUMERIC_FEATURES[index].value(record),
                        Column::Indicator { feature, category } => {
                            if positions[feature] == category {
                                1.0
                            } else {
                                0.0
                            }
                        }
                    })
                    .collect()
            })
            .collect();

        debug!(
            rows = records.len(),
            columns = schema.len(),
            "Encoded feature batch"
        );

        Ok(EncodedBatch { schema, rows })
    }

    /// Encode a single record; its field set reflects only its own categories
    pub fn encode_record(&self, record: &RawRecord) -> Result<FeatureVector> {
        let EncodedBatch { schema, rows } = self.encode_batch(std::slice::from_ref(record))?;
        let row = rows.into_iter().next().unwrap_or_default();
        Ok(FeatureVector::new(
            schema.columns().iter().cloned().zip(row).collect(),
        ))
    }
}

/// Check numeric ranges and resolve each categorical value to its position
fn validate_record(record: &RawRecord) -> Result<Vec<usize>> {
    for feature in NUMERIC_FEATURES {
        let value = feature.value(record);
        if !feature.contains(value) {
            return Err(PredictorError::OutOfDomain {
                field: feature.name.to_string(),
                value,
                min: feature.min,
                max: feature.max,
            });
        }
    }

    CATEGORICAL_FEATURES
        .iter()
        .map(|feature| category_position(feature, record))
        .collect()
}

fn category_position(feature: &CategoricalFeature, record: &RawRecord) -> Result<usize> {
    let value = record.categorical(feature.name).unwrap_or_default();
    feature
        .position(value)
        .ok_or_else(|| PredictorError::UnknownCategory {
            attribute: feature.name.to_string(),
            value: value.to_string(),
            expected: feature.categories.join(", "),
        })
}
