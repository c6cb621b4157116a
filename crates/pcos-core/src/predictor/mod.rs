//! Classifier wrapper
//!
//! The [`Predictor`] feeds a validated, catalog-ordered feature vector to a
//! pre-loaded [`Classifier`] and turns its class probabilities into a
//! [`Prediction`].

mod bundle;
mod inference;
mod output;
mod stub;

pub use bundle::{compute_checksum, LoadedModel, ModelBundle, ModelManifest, MAX_MODEL_BYTES};
pub use inference::OnnxClassifier;
pub use output::{OutputFormatter, RENORMALIZE_TOLERANCE, SUM_TOLERANCE};
pub use stub::FixedClassifier;

use crate::catalog::FeatureCatalog;
use crate::error::{PcosError, Result};
use crate::models::{Prediction, ValidatedFeatures};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

/// Binary classifier returning `[p_negative, p_positive]`
pub trait Classifier: Send + Sync {
    /// Class probabilities for one feature vector in catalog order
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]>;

    /// Version string of the loaded model
    fn version(&self) -> &str;
}

/// Read-only predictor shared by every session
#[derive(Clone)]
pub struct Predictor {
    classifier: Arc<dyn Classifier>,
    catalog: Arc<FeatureCatalog>,
    formatter: OutputFormatter,
}

impl Predictor {
    pub fn new(classifier: Arc<dyn Classifier>, catalog: Arc<FeatureCatalog>) -> Self {
        Self {
            classifier,
            catalog,
            formatter: OutputFormatter::new(),
        }
    }

    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    pub fn catalog(&self) -> &FeatureCatalog {
        &self.catalog
    }

    pub fn predict(&self, features: &ValidatedFeatures) -> Result<Prediction> {
        if features.names().iter().ne(self.catalog.iter().map(|f| &f.name)) {
            return Err(PcosError::PredictionFailed(
                "feature vector is not in catalog order".to_string(),
            ));
        }

        let start = Instant::now();
        let raw = self.classifier.predict_proba(features.values())?;
        let elapsed = start.elapsed();

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        self.formatter.format(raw)
    }
}
