//! ONNX inference using tract
//!
//! Loads a binary classifier exported to ONNX (for scikit-learn models:
//! exported without the ZipMap operator, so the probability output is a plain
//! `[1, 2]` float tensor) and runs it on one feature vector at a time.

use super::Classifier;
use crate::error::{PcosError, Result};
use tract_onnx::prelude::*;
use tracing::debug;

/// Number of classes produced by the model
const NUM_CLASSES: usize = 2;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based classifier
pub struct OnnxClassifier {
    model: TractModel,
    num_features: usize,
    probability_output: usize,
    version: String,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("num_features", &self.num_features)
            .field("probability_output", &self.probability_output)
            .field("version", &self.version)
            .finish()
    }
}

impl OnnxClassifier {
    /// Create a classifier from model bytes
    ///
    /// # Arguments
    /// * `model_bytes` - Serialized ONNX graph
    /// * `num_features` - Width of the single `[1, n]` float input
    /// * `probability_output` - Index of the model output holding class probabilities
    pub fn new(
        model_bytes: &[u8],
        num_features: usize,
        probability_output: usize,
        version: impl Into<String>,
    ) -> Result<Self> {
        let model = Self::load_model(model_bytes, num_features)?;
        Ok(Self {
            model,
            num_features,
            probability_output,
            version: version.into(),
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], num_features: usize) -> Result<TractModel> {
        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| PcosError::ModelLoad(format!("failed to parse ONNX model: {:#}", e)))?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .map_err(|e| PcosError::ModelLoad(format!("failed to set input shape: {:#}", e)))?
            .into_optimized()
            .map_err(|e| PcosError::ModelLoad(format!("failed to optimize model: {:#}", e)))?
            .into_runnable()
            .map_err(|e| PcosError::ModelLoad(format!("failed to create runnable model: {:#}", e)))
    }

    fn features_to_tensor(&self, features: &[f64]) -> Result<Tensor> {
        let data: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)
            .map_err(|e| PcosError::PredictionFailed(format!("bad input shape: {}", e)))?;
        Ok(array.into())
    }

    fn tensor_to_probabilities(&self, output: &Tensor) -> Result<[f64; 2]> {
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| PcosError::PredictionFailed(format!("probability output is not f32: {:#}", e)))?;
        let values: Vec<f32> = view.iter().copied().collect();

        if values.len() < NUM_CLASSES {
            return Err(PcosError::PredictionFailed(format!(
                "model output has {} values, expected {}",
                values.len(),
                NUM_CLASSES
            )));
        }

        Ok([values[0] as f64, values[1] as f64])
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2]> {
        if features.len() != self.num_features {
            return Err(PcosError::PredictionFailed(format!(
                "got {} features, model expects {}",
                features.len(),
                self.num_features
            )));
        }

        let input = self.features_to_tensor(features)?;
        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PcosError::PredictionFailed(format!("{:#}", e)))?;
        let output = result.get(self.probability_output).ok_or_else(|| {
            PcosError::PredictionFailed(format!(
                "model has no output #{}",
                self.probability_output
            ))
        })?;

        let probabilities = self.tensor_to_probabilities(output)?;
        debug!(?probabilities, "Classifier output");
        Ok(probabilities)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_fail_to_load() {
        let err = OnnxClassifier::new(b"definitely not onnx", 10, 1, "v1").unwrap_err();
        assert!(matches!(err, PcosError::ModelLoad(_)));
    }
}
