//! Model bundle loading
//!
//! A bundle is a JSON manifest sitting next to an ONNX file:
//!
//! ```json
//! {
//!   "version": "rf-2024.1",
//!   "model_file": "finalmodel_klasifikasiPCOS.onnx",
//!   "features": ["Follicle No. (R)", "..."],
//!   "sha256": "9f86d0...",
//!   "probability_output": 1
//! }
//! ```
//!
//! Loading happens once at startup; every failure here is fatal for the
//! service.

use super::inference::OnnxClassifier;
use crate::catalog::FeatureCatalog;
use crate::error::{PcosError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Largest model file accepted (50MB)
pub const MAX_MODEL_BYTES: usize = 50 * 1024 * 1024;

fn default_probability_output() -> usize {
    1
}

/// Manifest describing the classifier artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: String,
    /// ONNX file, relative paths resolve against the manifest directory
    pub model_file: PathBuf,
    /// Ordered feature names the model was trained on
    pub features: Vec<String>,
    /// Hex SHA-256 of the model file, checked when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Index of the class-probability output
    #[serde(default = "default_probability_output")]
    pub probability_output: usize,
}

impl ModelManifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| {
            PcosError::ModelLoad(format!("cannot read manifest {}: {}", path.display(), e))
        })?;
        serde_json::from_slice(&data).map_err(|e| {
            PcosError::ModelLoad(format!("invalid manifest {}: {}", path.display(), e))
        })
    }
}

/// A loaded, verified classifier plus its manifest
#[derive(Debug)]
pub struct LoadedModel {
    pub manifest: ModelManifest,
    pub classifier: OnnxClassifier,
    pub checksum: String,
    pub size_bytes: usize,
}

/// Loader for model bundles
#[derive(Debug, Clone)]
pub struct ModelBundle {
    manifest_path: PathBuf,
    max_model_bytes: usize,
}

impl ModelBundle {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            max_model_bytes: MAX_MODEL_BYTES,
        }
    }

    pub fn with_max_model_bytes(mut self, max_model_bytes: usize) -> Self {
        self.max_model_bytes = max_model_bytes;
        self
    }

    /// Resolve the model file path declared by a manifest
    pub fn model_path(&self, manifest: &ModelManifest) -> PathBuf {
        if manifest.model_file.is_absolute() {
            manifest.model_file.clone()
        } else {
            self.manifest_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(&manifest.model_file)
        }
    }

    /// Read the manifest, verify the model against it and the catalog, and load it
    pub fn load(&self, catalog: &FeatureCatalog) -> Result<LoadedModel> {
        let manifest = ModelManifest::from_path(&self.manifest_path)?;
        catalog.ensure_matches(&manifest.features)?;

        let model_path = self.model_path(&manifest);
        let cannot_read = |e: std::io::Error| {
            PcosError::ModelLoad(format!("cannot read model {}: {}", model_path.display(), e))
        };

        // Reject oversized artifacts before reading them
        let size = fs::metadata(&model_path).map_err(cannot_read)?.len();
        if size > self.max_model_bytes as u64 {
            return Err(PcosError::ModelLoad(format!(
                "model size {} exceeds maximum {}",
                size, self.max_model_bytes
            )));
        }

        let bytes = fs::read(&model_path).map_err(cannot_read)?;

        let checksum = compute_checksum(&bytes);
        if let Some(expected) = &manifest.sha256 {
            if !expected.eq_ignore_ascii_case(&checksum) {
                return Err(PcosError::ModelLoad(format!(
                    "checksum mismatch: expected {}, got {}",
                    expected, checksum
                )));
            }
        }

        let classifier = OnnxClassifier::new(
            &bytes,
            manifest.features.len(),
            manifest.probability_output,
            manifest.version.clone(),
        )?;

        info!(
            version = %manifest.version,
            path = %model_path.display(),
            size = bytes.len(),
            checksum = %checksum,
            "Model loaded"
        );

        Ok(LoadedModel {
            size_bytes: bytes.len(),
            manifest,
            classifier,
            checksum,
        })
    }
}

/// Hex-encoded SHA-256 of a byte slice
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
