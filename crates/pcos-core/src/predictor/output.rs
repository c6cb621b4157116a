//! Classifier output post-processing
//!
//! Turns a raw `[p_negative, p_positive]` pair into a [`Prediction`] whose
//! probabilities sum to one and whose label agrees with them.

use crate::error::{PcosError, Result};
use crate::models::{Label, Prediction};

/// Largest deviation from 1.0 accepted for the raw probability sum
pub const SUM_TOLERANCE: f64 = 1e-2;

/// Deviation below which raw probabilities are passed through unchanged
pub const RENORMALIZE_TOLERANCE: f64 = 1e-9;

/// Formats raw class probabilities into a [`Prediction`]
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    sum_tolerance: f64,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self {
            sum_tolerance: SUM_TOLERANCE,
        }
    }

    /// Format raw model outputs
    ///
    /// # Arguments
    /// * `raw` - Class probabilities `[p_negative, p_positive]`
    pub fn format(&self, raw: [f64; 2]) -> Result<Prediction> {
        let [negative, positive] = raw;

        if !negative.is_finite() || !positive.is_finite() {
            return Err(PcosError::PredictionFailed(format!(
                "non-finite class probabilities {:?}",
                raw
            )));
        }
        if negative < 0.0 || positive < 0.0 {
            return Err(PcosError::PredictionFailed(format!(
                "negative class probabilities {:?}",
                raw
            )));
        }

        let sum = negative + positive;
        if (sum - 1.0).abs() > self.sum_tolerance {
            return Err(PcosError::PredictionFailed(format!(
                "class probabilities sum to {}, expected 1",
                sum
            )));
        }

        let (probability_negative, probability_positive) =
            if (sum - 1.0).abs() > RENORMALIZE_TOLERANCE {
                (negative / sum, positive / sum)
            } else {
                (negative, positive)
            };

        // Ties go to the positive class
        let label = if probability_positive >= probability_negative {
            Label::Positive
        } else {
            Label::Negative
        };

        Ok(Prediction {
            label,
            probability_positive,
            probability_negative,
        })
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_probabilities_pass_through() {
        let p = OutputFormatter::new().format([0.3, 0.7]).unwrap();
        assert_eq!(p.label, Label::Positive);
        assert_eq!(p.probability_positive, 0.7);
        assert_eq!(p.probability_negative, 0.3);
    }

    #[test]
    fn test_negative_label() {
        let p = OutputFormatter::new().format([0.82, 0.18]).unwrap();
        assert_eq!(p.label, Label::Negative);
        assert_eq!(p.confidence(), 0.82);
    }

    #[test]
    fn test_tie_is_positive() {
        let p = OutputFormatter::new().format([0.5, 0.5]).unwrap();
        assert_eq!(p.label, Label::Positive);
    }

    #[test]
    fn test_small_drift_renormalized() {
        // float32 model outputs rarely sum to exactly one
        let p = OutputFormatter::new().format([0.300_001, 0.700_003]).unwrap();
        assert!((p.probability_positive + p.probability_negative - 1.0).abs() < 1e-12);
        assert_eq!(p.label, Label::Positive);
    }

    #[test]
    fn test_invalid_outputs_rejected() {
        let formatter = OutputFormatter::new();
        assert!(formatter.format([f64::NAN, 0.5]).is_err());
        assert!(formatter.format([-0.1, 1.1]).is_err());
        assert!(formatter.format([2.0, 3.0]).is_err());
        assert!(formatter.format([0.0, 0.0]).is_err());
    }
}
