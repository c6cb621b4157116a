//! User-facing advice attached to a prediction

use crate::models::{Label, Prediction};
use serde::{Deserialize, Serialize};

/// Shown with every result
pub const DISCLAIMER: &str =
    "Sistem ini hanya berfungsi sebagai alat bantu prediksi, bukan diagnosis medis.";

/// Follow-up advice for a predicted class
pub fn recommendation_for(label: Label) -> &'static str {
    match label {
        Label::Positive => concat!(
            "Sistem menyarankan untuk melakukan konsultasi ke dokter spesialis kandungan ",
            "untuk pemeriksaan lebih lanjut."
        ),
        Label::Negative => concat!(
            "Tetap jaga pola hidup sehat dan lakukan pemeriksaan rutin. ",
            "Segera konsultasi ke dokter apabila muncul keluhan lain."
        ),
    }
}

/// Result summary presented after a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    /// e.g. `Hasil: PCOS`
    pub headline: String,
    /// Probability of the predicted class, as a percentage string
    pub probability_text: String,
    pub recommendation: String,
    pub disclaimer: String,
}

impl Advice {
    pub fn for_prediction(prediction: &Prediction) -> Self {
        Self {
            headline: format!("Hasil: {}", prediction.label),
            probability_text: format!("Probabilitas: {}", format_percent(prediction.confidence())),
            recommendation: recommendation_for(prediction.label).to_string(),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

/// Format a probability as a percentage with two decimals, e.g. `70.00%`
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}
