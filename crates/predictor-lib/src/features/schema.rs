//! Feature schema, fingerprints and alignment

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Ordered list of feature names a model was trained on.
///
/// Built once per training run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema, rejecting duplicate column names
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(PredictorError::SchemaValidation(format!(
                    "duplicate feature column '{}'",
                    column
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Columns generated from the declared feature tables are unique by
    /// construction
    pub(super) fn from_unique(columns: Vec<String>) -> Self {
        debug_assert!(Self::new(columns.clone()).is_ok());
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of `column`, if the schema has it
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// SHA256 over the ordered column names.
    ///
    /// Two schemas share a fingerprint only if they have the same columns in
    /// the same order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    /// Reconcile an encoded vector with this schema.
    ///
    /// Schema fields missing from `vector` are zero-filled, fields not in the
    /// schema are dropped, and the output follows schema order exactly.
    pub fn align(&self, vector: &FeatureVector) -> AlignedVector {
        let lookup: HashMap<&str, f64> = vector
            .fields()
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        let values = self
            .columns
            .iter()
            .map(|column| lookup.get(column.as_str()).copied().unwrap_or(0.0))
            .collect();
        AlignedVector {
            values,
            schema_fingerprint: self.fingerprint(),
        }
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = PredictorError;

    fn try_from(columns: Vec<String>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

/// Named numeric fields of one encoded record, in encoding order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    fields: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new(fields: Vec<(String, f64)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, f64)] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A feature vector laid out in a schema's order, ready for the model
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedVector {
    values: Vec<f64>,
    schema_fingerprint: String,
}

impl AlignedVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn schema_fingerprint(&self) -> &str {
        &self.schema_fingerprint
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// View as a named vector under `schema`
    pub fn to_feature_vector(&self, schema: &FeatureSchema) -> FeatureVector {
        FeatureVector::new(
            schema
                .columns()
                .iter()
                .cloned()
                .zip(self.values.iter().copied())
                .collect(),
        )
    }
}
