//! Observability infrastructure for the charges predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcome counters, artifact reloads, model version)
//! - Structured event logging with tracing

use crate::error::ErrorClass;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_served: IntCounter,
    prediction_errors: IntCounterVec,
    artifact_reloads: IntCounterVec,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "charges_prediction_latency_seconds",
                "Time spent encoding, aligning and scoring one request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_served: register_int_counter!(
                "charges_predictions_served_total",
                "Total number of successful predictions"
            )
            .expect("Failed to register predictions_served"),

            prediction_errors: register_int_counter_vec!(
                "charges_prediction_errors_total",
                "Failed predictions by error class",
                &["class"]
            )
            .expect("Failed to register prediction_errors"),

            artifact_reloads: register_int_counter_vec!(
                "charges_artifact_reloads_total",
                "Explicit artifact reloads by outcome",
                &["outcome"]
            )
            .expect("Failed to register artifact_reloads"),

            model_info: register_gauge_vec!(
                "charges_model_info",
                "Currently loaded model version and schema fingerprint",
                &["version", "schema_fingerprint"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle on the process-wide Prometheus metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions_served(&self) {
        self.inner().predictions_served.inc();
    }

    pub fn inc_prediction_errors(&self, class: ErrorClass) {
        self.inner()
            .prediction_errors
            .with_label_values(&[class.as_str()])
            .inc();
    }

    pub fn inc_reloads(&self, outcome: &str) {
        self.inner()
            .artifact_reloads
            .with_label_values(&[outcome])
            .inc();
    }

    /// Publish the active model; only one version is reported at a time
    pub fn set_model_info(&self, version: &str, schema_fingerprint: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[version, schema_fingerprint])
            .set(1.0);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "server_started",
            component = %self.component,
            service_version = %version,
            addr = %addr,
            "Prediction server started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            component = %self.component,
            reason = %reason,
            "Prediction server shutting down"
        );
    }

    pub fn log_prediction(&self, predicted_charges: f64, model_version: &str, elapsed_us: u128) {
        info!(
            event = "prediction_served",
            component = %self.component,
            predicted_charges = predicted_charges,
            model_version = %model_version,
            elapsed_us = elapsed_us as u64,
            "Served prediction"
        );
    }

    /// Client errors are expected traffic; internal ones need attention
    pub fn log_prediction_failure(&self, stage: &str, class: ErrorClass, message: &str) {
        match class {
            ErrorClass::Client | ErrorClass::Data => {
                info!(
                    event = "prediction_rejected",
                    component = %self.component,
                    stage = %stage,
                    class = class.as_str(),
                    error = %message,
                    "Rejected prediction request"
                );
            }
            ErrorClass::Deployment => {
                warn!(
                    event = "prediction_failed",
                    component = %self.component,
                    stage = %stage,
                    class = class.as_str(),
                    error = %message,
                    "Prediction artifacts unavailable"
                );
            }
            ErrorClass::Internal => {
                error!(
                    event = "prediction_failed",
                    component = %self.component,
                    stage = %stage,
                    class = class.as_str(),
                    error = %message,
                    "Internal prediction failure"
                );
            }
        }
    }

    pub fn log_training_completed(
        &self,
        model_version: &str,
        train_rows: usize,
        columns: usize,
        r2: Option<f64>,
        rmse: Option<f64>,
    ) {
        info!(
            event = "training_completed",
            component = %self.component,
            model_version = %model_version,
            train_rows = train_rows,
            columns = columns,
            r2 = ?r2,
            rmse = ?rmse,
            "Training run completed"
        );
    }
}
