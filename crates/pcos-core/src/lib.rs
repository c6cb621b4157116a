//! Core library for the PCOS prediction service
//!
//! This crate provides:
//! - The feature catalog and form input collection
//! - Completeness validation ahead of inference
//! - ONNX classifier loading and prediction
//! - The append-only CSV prediction history
//! - Health checks and observability

pub mod catalog;
pub mod error;
pub mod health;
pub mod history;
pub mod input;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod recommendation;
pub mod session;
pub mod validator;

pub use catalog::{FeatureCatalog, FeatureKind, FeatureSpec};
pub use error::{PcosError, Result};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use history::{HistoryLog, HistoryStore};
pub use input::{FieldError, InputCollector, InputWidget, RawForm};
pub use models::*;
pub use observability::{PcosMetrics, StructuredLogger};
pub use pipeline::{PredictOutcome, PredictionPipeline, PredictionReport};
pub use predictor::{Classifier, Predictor};
pub use session::Session;
pub use validator::Validator;
