//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, rejected forms, history errors, model version)
//! - Structured JSON logging with tracing

use crate::models::PredictionRecord;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PcosMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct PcosMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    rejected_submissions: IntCounter,
    prediction_errors: IntCounter,
    history_append_errors: IntCounter,
    active_sessions: IntGauge,
    model_version_info: GaugeVec,
}

impl PcosMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "pcos_prediction_latency_seconds",
                "Time spent validating, classifying and recording one submission",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "pcos_predictions_total",
                "Predictions generated, by predicted label",
                &["label"]
            )
            .expect("Failed to register predictions_total"),

            rejected_submissions: register_int_counter!(
                "pcos_rejected_submissions_total",
                "Submissions rejected because of missing or malformed input"
            )
            .expect("Failed to register rejected_submissions"),

            prediction_errors: register_int_counter!(
                "pcos_prediction_errors_total",
                "Classifier failures"
            )
            .expect("Failed to register prediction_errors"),

            history_append_errors: register_int_counter!(
                "pcos_history_append_errors_total",
                "Failures appending to the history file"
            )
            .expect("Failed to register history_append_errors"),

            active_sessions: register_int_gauge!(
                "pcos_active_sessions",
                "Number of open form sessions"
            )
            .expect("Failed to register active_sessions"),

            model_version_info: register_gauge_vec!(
                "pcos_model_version_info",
                "Information about the currently loaded classifier",
                &["version", "checksum"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PcosMetrics {
    _private: (),
}

impl Default for PcosMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PcosMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PcosMetrics")
    }
}

impl PcosMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PcosMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PcosMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self, label: &str) {
        self.inner().predictions_total.with_label_values(&[label]).inc();
    }

    pub fn inc_rejected_submissions(&self) {
        self.inner().rejected_submissions.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors.inc();
    }

    pub fn inc_history_append_errors(&self) {
        self.inner().history_append_errors.inc();
    }

    pub fn set_active_sessions(&self, count: i64) {
        self.inner().active_sessions.set(count);
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str, checksum: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, checksum])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions and
/// lifecycle events.
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a completed prediction. Feature values are not logged.
    pub fn log_prediction(&self, session_id: &str, record: &PredictionRecord, model_version: &str) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            session_id = %session_id,
            label = %record.label,
            probability_positive = record.probability_positive,
            probability_negative = record.probability_negative,
            model_version = %model_version,
            "Generated prediction"
        );
    }

    /// Log a submission rejected before inference
    pub fn log_rejected(&self, session_id: &str, missing: &[String], field_errors: usize) {
        info!(
            event = "prediction_rejected",
            instance = %self.instance,
            session_id = %session_id,
            missing = ?missing,
            field_errors = field_errors,
            "Incomplete input, prediction skipped"
        );
    }

    pub fn log_history_appended(&self, path: &str, rows_label: &str) {
        info!(
            event = "history_appended",
            instance = %self.instance,
            path = %path,
            label = %rows_label,
            "Prediction saved to history"
        );
    }

    pub fn log_history_error(&self, path: &str, error: &str) {
        warn!(
            event = "history_append_failed",
            instance = %self.instance,
            path = %path,
            error = %error,
            "Failed to save prediction to history"
        );
    }

    pub fn log_model_loaded(&self, version: &str, checksum: &str, features: usize) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            model_version = %version,
            checksum = %checksum,
            features = features,
            "Classifier loaded"
        );
    }

    pub fn log_startup(&self, version: &str, model_version: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            model_version = %model_version,
            "PCOS prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "PCOS prediction service shutting down"
        );
    }
}
