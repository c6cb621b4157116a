//! Form input collection
//!
//! Each catalog feature is backed by an [`InputWidget`] that turns one raw
//! text value into a number or the missing-marker. A bad value in one field
//! never stops the remaining fields from being collected.

use crate::catalog::{Choice, FeatureCatalog, FeatureKind, FeatureSpec, UNSELECTED};
use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Field-level problem reported back to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldError {
    MalformedNumericInput { field: String, value: String },
    UnknownChoice { field: String, value: String },
}

impl FieldError {
    pub fn field(&self) -> &str {
        match self {
            FieldError::MalformedNumericInput { field, .. } => field,
            FieldError::UnknownChoice { field, .. } => field,
        }
    }

    /// Message shown next to the field
    pub fn message(&self) -> String {
        match self {
            FieldError::MalformedNumericInput { field, .. } => {
                format!("Input {} harus berupa angka!", field)
            }
            FieldError::UnknownChoice { field, value } => {
                format!("Pilihan {:?} tidak tersedia untuk {}", value, field)
            }
        }
    }
}

impl From<FieldError> for crate::error::PcosError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::MalformedNumericInput { field, value } => {
                crate::error::PcosError::MalformedNumericInput { field, value }
            }
            FieldError::UnknownChoice { field, value } => {
                crate::error::PcosError::UnknownChoice { field, value }
            }
        }
    }
}

/// Widget collecting one feature value
#[derive(Debug, Clone)]
pub enum InputWidget {
    NumericInput { field: String },
    BinaryChoice { field: String, choices: Vec<Choice> },
    CategoricalChoice { field: String, choices: Vec<Choice> },
}

impl InputWidget {
    pub fn for_spec(spec: &FeatureSpec) -> Self {
        let field = spec.name.clone();
        match spec.kind {
            FeatureKind::Numeric => InputWidget::NumericInput { field },
            FeatureKind::Binary => InputWidget::BinaryChoice {
                field,
                choices: spec.choices.clone(),
            },
            FeatureKind::Categorical => InputWidget::CategoricalChoice {
                field,
                choices: spec.choices.clone(),
            },
        }
    }

    pub fn field(&self) -> &str {
        match self {
            InputWidget::NumericInput { field }
            | InputWidget::BinaryChoice { field, .. }
            | InputWidget::CategoricalChoice { field, .. } => field,
        }
    }

    /// Turn a raw value into a number, `Ok(None)` for "not supplied"
    pub fn collect(&self, raw: &str) -> Result<Option<f64>, FieldError> {
        match self {
            InputWidget::NumericInput { field } => parse_numeric(field, raw),
            InputWidget::BinaryChoice { field, choices }
            | InputWidget::CategoricalChoice { field, choices } => {
                select_choice(field, choices, raw)
            }
        }
    }
}

fn parse_numeric(field: &str, raw: &str) -> Result<Option<f64>, FieldError> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.replace(',', ".").parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(FieldError::MalformedNumericInput {
            field: field.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn select_choice(field: &str, choices: &[Choice], raw: &str) -> Result<Option<f64>, FieldError> {
    let text = raw.trim();
    if text.is_empty() || text == UNSELECTED {
        return Ok(None);
    }
    // The bare code of a choice ("0", "1") selects it as well as its label
    let code = text.parse::<f64>().ok();
    choices
        .iter()
        .find(|c| c.label == text || code == Some(c.value))
        .map(|c| Some(c.value))
        .ok_or_else(|| FieldError::UnknownChoice {
            field: field.to_string(),
            value: raw.to_string(),
        })
}

/// Raw form values keyed by feature name
pub type RawForm = BTreeMap<String, String>;

/// Result of collecting a whole form
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedForm {
    pub vector: FeatureVector,
    pub errors: Vec<FieldError>,
}

/// Collects raw form values into a [`FeatureVector`]
#[derive(Debug, Clone)]
pub struct InputCollector {
    widgets: Vec<InputWidget>,
}

impl InputCollector {
    pub fn new(catalog: &FeatureCatalog) -> Self {
        Self {
            widgets: catalog.iter().map(InputWidget::for_spec).collect(),
        }
    }

    pub fn widgets(&self) -> &[InputWidget] {
        &self.widgets
    }

    /// Collect one value per catalog feature. Absent fields count as unselected.
    pub fn collect(&self, raw: &RawForm) -> CollectedForm {
        for name in raw.keys() {
            if !self.widgets.iter().any(|w| w.field() == name) {
                debug!(field = %name, "Ignoring input for unknown feature");
            }
        }

        let mut entries = Vec::with_capacity(self.widgets.len());
        let mut errors = Vec::new();

        for widget in &self.widgets {
            let value = match raw.get(widget.field()) {
                Some(text) => match widget.collect(text) {
                    Ok(value) => value,
                    Err(e) => {
                        errors.push(e);
                        None
                    }
                },
                None => None,
            };
            entries.push((widget.field().to_string(), value));
        }

        CollectedForm {
            vector: FeatureVector::from_entries(entries),
            errors,
        }
    }
}
