//! Error taxonomy for training and serving
//!
//! Every failure carries a [`ErrorClass`] so outer layers can decide how to
//! surface it (client error, deployment error, internal fault) without
//! matching on individual variants.

use std::path::PathBuf;

/// Result type for predictor operations
pub type Result<T> = std::result::Result<T, PredictorError>;

/// Who is responsible for a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad training data; fatal for that load
    Data,
    /// Bad single-request input; recoverable by the caller
    Client,
    /// Artifacts absent or inconsistent; an operator has to act
    Deployment,
    /// Invariant violation inside the predictor
    Internal,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Data => "data",
            ErrorClass::Client => "client",
            ErrorClass::Deployment => "deployment",
            ErrorClass::Internal => "internal",
        }
    }
}

/// Main error type for the predictor
#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("Dataset schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("Unknown category '{value}' for attribute '{attribute}' (expected one of: {expected})")]
    UnknownCategory {
        attribute: String,
        value: String,
        expected: String,
    },

    #[error("Value {value} for '{field}' is outside the allowed range {min}..={max}")]
    OutOfDomain {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Model artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("Feature schema not found: {} (has a training run completed?)", path.display())]
    SchemaNotFound { path: PathBuf },

    #[error("Model was trained against schema {model} but the registered schema is {schema}")]
    ArtifactMismatch { model: String, schema: String },

    #[error("Artifact {} is corrupt: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("Feature vector has {actual} values but the model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Feature vector was aligned to schema {actual} but the model expects {expected}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Model produced a non-finite prediction ({0})")]
    NonFinitePrediction(f64),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PredictorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PredictorError::SchemaValidation(_) => ErrorClass::Data,
            PredictorError::UnknownCategory { .. } | PredictorError::OutOfDomain { .. } => {
                ErrorClass::Client
            }
            PredictorError::ArtifactMissing { .. }
            | PredictorError::SchemaNotFound { .. }
            | PredictorError::ArtifactMismatch { .. }
            | PredictorError::CorruptArtifact { .. } => ErrorClass::Deployment,
            PredictorError::DimensionMismatch { .. }
            | PredictorError::SchemaMismatch { .. }
            | PredictorError::NonFinitePrediction(_)
            | PredictorError::Training(_)
            | PredictorError::Io(_)
            | PredictorError::Serialization(_) => ErrorClass::Internal,
        }
    }

    /// True for failures caused by the request itself
    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::Client
    }
}
