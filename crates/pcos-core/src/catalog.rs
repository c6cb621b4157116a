//! Feature catalog
//!
//! The catalog is the single declared list of input features. Its order is
//! the order the classifier consumes and the order of the history columns.

use crate::error::{PcosError, Result};
use serde::{Deserialize, Serialize};

/// Label of the "nothing selected yet" entry of every choice field
pub const UNSELECTED: &str = "Pilih...";

/// How a feature is entered on the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Free-text decimal number
    Numeric,
    /// Yes/no selection
    Binary,
    /// Selection from a named set of categories
    Categorical,
}

/// One selectable entry of a choice field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub value: f64,
}

impl Choice {
    fn new(label: &str, value: f64) -> Self {
        Self {
            label: label.to_string(),
            value,
        }
    }
}

/// Static description of one input feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub description: String,
    pub range_hint: String,
    pub kind: FeatureKind,
    /// Selectable entries, excluding the unselected sentinel. Empty for numeric features.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl FeatureSpec {
    pub fn numeric(name: &str, description: &str, range_hint: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            range_hint: range_hint.to_string(),
            kind: FeatureKind::Numeric,
            choices: Vec::new(),
        }
    }

    /// Yes/no feature encoded as `Tidak (0)` / `Ya (1)`
    pub fn binary(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            range_hint: "Pilih: Tidak (0) / Ya (1)".to_string(),
            kind: FeatureKind::Binary,
            choices: vec![Choice::new("Tidak (0)", 0.0), Choice::new("Ya (1)", 1.0)],
        }
    }

    pub fn categorical(name: &str, description: &str, range_hint: &str, choices: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            range_hint: range_hint.to_string(),
            kind: FeatureKind::Categorical,
            choices: choices
                .iter()
                .map(|(label, value)| Choice::new(label, *value))
                .collect(),
        }
    }
}

/// Ordered set of features required by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCatalog {
    features: Vec<FeatureSpec>,
}

impl FeatureCatalog {
    /// Build a catalog from an ordered feature list. Names must be unique.
    pub fn new(features: Vec<FeatureSpec>) -> Result<Self> {
        for (i, spec) in features.iter().enumerate() {
            if features[..i].iter().any(|other| other.name == spec.name) {
                return Err(PcosError::FeatureMismatch {
                    model: vec![spec.name.clone()],
                    catalog: features.iter().map(|f| f.name.clone()).collect(),
                });
            }
        }
        Ok(Self { features })
    }

    /// The ten features of the PCOS classifier, in model order
    pub fn pcos() -> Self {
        Self {
            features: vec![
                FeatureSpec::numeric(
                    "Follicle No. (R)",
                    "Masukkan jumlah folikel di ovarium kanan",
                    "Contoh: 0 - 25",
                ),
                FeatureSpec::numeric(
                    "Follicle No. (L)",
                    "Masukkan jumlah folikel di ovarium kiri",
                    "Contoh: 0 - 25",
                ),
                FeatureSpec::binary("Skin darkening (Y/N)", "Apakah terdapat penggelapan kulit"),
                FeatureSpec::binary("Weight gain(Y/N)", "Apakah terjadi peningkatan berat badan"),
                FeatureSpec::binary("hair growth(Y/N)", "Apakah terjadi pertumbuhan rambut berlebih"),
                FeatureSpec::categorical(
                    "Cycle(R/I)",
                    "Tipe siklus menstruasi",
                    "Pilih: Regular = Teratur (0) atau Irregular = Tidak Teratur (1)",
                    &[("Regular (0)", 0.0), ("Irregular (1)", 1.0)],
                ),
                FeatureSpec::numeric(
                    "AMH(ng/mL)",
                    "Masukkan nilai Anti-Müllerian Hormone",
                    "Contoh: 1 - 10",
                ),
                FeatureSpec::numeric(
                    "Cycle length(days)",
                    "Panjang siklus menstruasi (hari)",
                    "Contoh: 21 - 35",
                ),
                FeatureSpec::numeric(
                    "FSH(mIU/mL)",
                    "Masukkan nilai Follicle-Stimulating Hormone",
                    "Contoh: 3 - 15",
                ),
                FeatureSpec::numeric(
                    "LH(mIU/mL)",
                    "Masukkan nilai Luteinizing Hormone",
                    "Contoh: 2 - 20",
                ),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureSpec> {
        self.features.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Feature names in catalog order
    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// Check that a model's declared feature order is exactly the catalog order
    pub fn ensure_matches(&self, model_features: &[String]) -> Result<()> {
        let names = self.names();
        if names.as_slice() != model_features {
            return Err(PcosError::FeatureMismatch {
                model: model_features.to_vec(),
                catalog: names,
            });
        }
        Ok(())
    }
}

impl Default for FeatureCatalog {
    fn default() -> Self {
        Self::pcos()
    }
}
