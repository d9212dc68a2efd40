//! Insurance charges prediction library
//!
//! This crate provides the core functionality for:
//! - Loading and splitting the insurance dataset
//! - Encoding applicant records into a stable, fingerprinted feature schema
//! - Fitting and persisting an ordinary least squares model
//! - Serving predictions from a swappable (model, schema) pair
//! - Metrics and structured logging

pub mod artifacts;
pub mod dataset;
pub mod error;
pub mod features;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod registry;
pub mod training;

pub use artifacts::{ArtifactPaths, ArtifactStore, LoadedArtifacts};
pub use error::{ErrorClass, PredictorError, Result};
pub use features::{FeatureEncoder, FeatureSchema, FeatureVector};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{predict_one, PredictionFailure, PredictionService, PredictionStage};
pub use registry::SchemaRegistry;
pub use training::{evaluate, train, EvaluationReport, TrainingConfig, TrainingReport};
