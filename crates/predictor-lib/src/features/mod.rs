//! Feature encoding for the linear model
//!
//! Turns raw applicant records into fixed-order numeric vectors. The
//! category order of every categorical attribute is declared here rather
//! than discovered from data, so the baseline (dropped) category is the same
//! for every training run and every request.

mod encoder;
mod schema;

pub use encoder::{EncodedBatch, FeatureEncoder};
pub use schema::{AlignedVector, FeatureSchema, FeatureVector};

use crate::models::RawRecord;

/// Numeric attributes copied verbatim into the feature vector, in order
pub const NUMERIC_FEATURES: &[NumericFeature] = &[
    NumericFeature {
        name: "age",
        attribute: NumericAttribute::Age,
        min: 18.0,
        max: 64.0,
    },
    NumericFeature {
        name: "bmi",
        attribute: NumericAttribute::Bmi,
        min: 10.0,
        max: 70.0,
    },
    NumericFeature {
        name: "children",
        attribute: NumericAttribute::Children,
        min: 0.0,
        max: 10.0,
    },
];

/// Categorical attributes, one-hot encoded in this order
pub const CATEGORICAL_FEATURES: &[CategoricalFeature] = &[
    CategoricalFeature {
        name: "sex",
        categories: &["female", "male"],
    },
    CategoricalFeature {
        name: "smoker",
        categories: &["no", "yes"],
    },
    CategoricalFeature {
        name: "region",
        categories: &["northeast", "northwest", "southeast", "southwest"],
    },
];

/// A passthrough numeric attribute and its documented range
#[derive(Debug, Clone, Copy)]
pub struct NumericFeature {
    pub name: &'static str,
    pub attribute: NumericAttribute,
    pub min: f64,
    pub max: f64,
}

/// Record field backing a numeric feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericAttribute {
    Age,
    Bmi,
    Children,
}

impl NumericAttribute {
    pub fn value(self, record: &RawRecord) -> f64 {
        match self {
            NumericAttribute::Age => record.age as f64,
            NumericAttribute::Bmi => record.bmi,
            NumericAttribute::Children => record.children as f64,
        }
    }
}

impl NumericFeature {
    pub fn value(&self, record: &RawRecord) -> f64 {
        self.attribute.value(record)
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// A categorical attribute with its declared category order.
///
/// `categories[0]` is the baseline and never gets an indicator field.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalFeature {
    pub name: &'static str,
    pub categories: &'static [&'static str],
}

impl CategoricalFeature {
    pub fn baseline(&self) -> &'static str {
        self.categories[0]
    }

    /// Position of `value` in the declared order
    pub fn position(&self, value: &str) -> Option<usize> {
        self.categories.iter().position(|c| *c == value)
    }

    /// Name of the indicator field for a non-baseline category
    pub fn indicator_name(&self, category: &str) -> String {
        format!("{}_{}", self.name, category)
    }

    /// Indicator field names for every non-baseline category
    pub fn indicator_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories[1..]
            .iter()
            .map(move |c| self.indicator_name(c))
    }
}
