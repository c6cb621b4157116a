//! Completeness check run before inference

use crate::error::{PcosError, Result};
use crate::models::{FeatureVector, ValidatedFeatures};

/// Gatekeeper between form collection and the predictor.
///
/// Only completeness is checked. Values outside the advisory range hints
/// pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// True when no entry carries the missing-marker
    pub fn validate(&self, vector: &FeatureVector) -> bool {
        vector.is_complete()
    }

    /// Convert a complete vector into [`ValidatedFeatures`], or report the missing fields
    pub fn check(&self, vector: &FeatureVector) -> Result<ValidatedFeatures> {
        ValidatedFeatures::from_complete(vector).ok_or_else(|| PcosError::MissingInput {
            fields: vector.missing(),
        })
    }
}
