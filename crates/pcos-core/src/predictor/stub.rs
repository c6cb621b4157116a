//! Deterministic classifier for tests and dry runs

use super::Classifier;
use crate::error::{PcosError, Result};
use std::sync::Mutex;

/// Classifier that always answers with the same class probabilities
pub struct FixedClassifier {
    probabilities: [f64; 2],
    version: String,
    last_input: Mutex<Option<Vec<f64>>>,
}

impl FixedClassifier {
    /// `probabilities` is `[p_negative, p_positive]`
    pub fn new(probabilities: [f64; 2]) -> Self {
        Self {
            probabilities,
            version: "fixed".to_string(),
            last_input: Mutex::new(None),
        }
    }

    /// Feature values passed to the most recent call
    pub fn last_input(&self) -> Option<Vec<f64>> {
        self.last_input.lock().ok()?.clone()
    }
}

impl Classifier for FixedClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        let mut last = self
            .last_input
            .lock()
            .map_err(|e| PcosError::PredictionFailed(format!("Lock poisoned: {}", e)))?;
        *last = Some(features.to_vec());
        Ok(self.probabilities)
    }

    fn version(&self) -> &str {
        &self.version
    }
}
