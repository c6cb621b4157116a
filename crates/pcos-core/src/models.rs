//! Core data models for the prediction pipeline

use crate::catalog::FeatureCatalog;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicted class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "PCOS")]
    Positive,
    #[serde(rename = "Tidak PCOS")]
    Negative,
}

impl Label {
    /// Text stored in the history file and shown to the user
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Positive => "PCOS",
            Label::Negative => "Tidak PCOS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "PCOS" => Some(Label::Positive),
            "Tidak PCOS" => Some(Label::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collected form values in catalog order; `None` is the missing-marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    entries: Vec<(String, Option<f64>)>,
}

impl FeatureVector {
    /// A vector with every catalog feature missing
    pub fn empty(catalog: &FeatureCatalog) -> Self {
        Self {
            entries: catalog.iter().map(|f| (f.name.clone(), None)).collect(),
        }
    }

    /// Build from explicit entries, keeping the given order
    pub fn from_entries(entries: Vec<(String, Option<f64>)>) -> Self {
        Self { entries }
    }

    /// Set a value; returns false if the feature is not part of the vector
    pub fn set(&mut self, name: &str, value: Option<f64>) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Option<f64>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn entries(&self) -> &[(String, Option<f64>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of features still carrying the missing-marker
    pub fn missing(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.is_some())
    }
}

/// A feature vector with every value present, in catalog order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedFeatures {
    names: Vec<String>,
    values: Vec<f64>,
}

impl ValidatedFeatures {
    /// Only the validator constructs this from a complete vector
    pub(crate) fn from_complete(vector: &FeatureVector) -> Option<Self> {
        let mut names = Vec::with_capacity(vector.len());
        let mut values = Vec::with_capacity(vector.len());
        for (name, value) in vector.entries() {
            names.push(name.clone());
            values.push((*value)?);
        }
        Some(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

/// Classifier output for one validated vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub probability_positive: f64,
    pub probability_negative: f64,
}

impl Prediction {
    /// Probability of the predicted class
    pub fn confidence(&self) -> f64 {
        match self.label {
            Label::Positive => self.probability_positive,
            Label::Negative => self.probability_negative,
        }
    }

    /// Class probabilities ordered `[Tidak PCOS, PCOS]` for charting
    pub fn distribution(&self) -> [f64; 2] {
        [self.probability_negative, self.probability_positive]
    }
}

/// One persisted prediction outcome: inputs plus classifier outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub label: Label,
    pub probability_positive: f64,
    pub probability_negative: f64,
    pub features: Vec<(String, f64)>,
}

impl PredictionRecord {
    pub fn new(prediction: &Prediction, features: &ValidatedFeatures) -> Self {
        Self {
            label: prediction.label,
            probability_positive: prediction.probability_positive,
            probability_negative: prediction.probability_negative,
            features: features.iter().map(|(n, v)| (n.to_string(), v)).collect(),
        }
    }

    pub fn feature(&self, name: &str) -> Option<f64> {
        self.features.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trips_through_text() {
        for label in [Label::Positive, Label::Negative] {
            assert_eq!(Label::parse(label.as_str()), Some(label));
        }
        assert_eq!(Label::parse("maybe"), None);
    }

    #[test]
    fn test_empty_vector_reports_all_missing() {
        let catalog = FeatureCatalog::pcos();
        let vector = FeatureVector::empty(&catalog);
        assert_eq!(vector.missing(), catalog.names());
        assert!(!vector.is_complete());
    }

    #[test]
    fn test_set_unknown_feature() {
        let catalog = FeatureCatalog::pcos();
        let mut vector = FeatureVector::empty(&catalog);
        assert!(!vector.set("BMI", Some(22.0)));
        assert!(vector.set("AMH(ng/mL)", Some(6.2)));
        assert_eq!(vector.get("AMH(ng/mL)"), Some(Some(6.2)));
    }

    #[test]
    fn test_validated_features_require_every_value() {
        let partial = FeatureVector::from_entries(vec![
            ("a".to_string(), Some(1.0)),
            ("b".to_string(), None),
        ]);
        assert!(ValidatedFeatures::from_complete(&partial).is_none());

        let full = FeatureVector::from_entries(vec![
            ("a".to_string(), Some(1.0)),
            ("b".to_string(), Some(2.0)),
        ]);
        let validated = ValidatedFeatures::from_complete(&full).unwrap();
        assert_eq!(validated.values(), &[1.0, 2.0]);
        assert_eq!(validated.get("b"), Some(2.0));
    }

    #[test]
    fn test_prediction_confidence_follows_label() {
        let p = Prediction {
            label: Label::Negative,
            probability_positive: 0.2,
            probability_negative: 0.8,
        };
        assert_eq!(p.confidence(), 0.8);
        assert_eq!(p.distribution(), [0.8, 0.2]);
    }
}
