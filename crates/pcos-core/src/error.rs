//! Error types for the prediction pipeline

use thiserror::Error;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PcosError>;

/// Errors raised while collecting input, running inference or touching the
/// history file.
#[derive(Debug, Error)]
pub enum PcosError {
    /// One or more required fields were unset at predict time
    #[error("missing input for: {}", fields.join(", "))]
    MissingInput { fields: Vec<String> },

    /// A free-text numeric field did not parse
    #[error("input {field} must be a number, got {value:?}")]
    MalformedNumericInput { field: String, value: String },

    /// A choice field received a label outside its choice list
    #[error("input {field} has no choice {value:?}")]
    UnknownChoice { field: String, value: String },

    /// The model artifact is missing or corrupt
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The model declares a feature list that differs from the catalog
    #[error("model features {model:?} do not match catalog features {catalog:?}")]
    FeatureMismatch {
        model: Vec<String>,
        catalog: Vec<String>,
    },

    /// The classifier produced an unusable output
    #[error("prediction failed: {0}")]
    PredictionFailed(String),

    /// A record's columns do not line up with the existing history header
    #[error("history header mismatch: file has {found:?}, record has {expected:?}")]
    HistorySchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A persisted history row could not be interpreted
    #[error("malformed history row {row}: {reason}")]
    MalformedHistory { row: usize, reason: String },

    #[error("history file error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PcosError {
    /// True for errors caused by the submitted form rather than the service
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PcosError::MissingInput { .. }
                | PcosError::MalformedNumericInput { .. }
                | PcosError::UnknownChoice { .. }
        )
    }

    /// True for failures reading or writing the history file
    pub fn is_history_error(&self) -> bool {
        matches!(
            self,
            PcosError::HistorySchemaMismatch { .. }
                | PcosError::MalformedHistory { .. }
                | PcosError::Csv(_)
                | PcosError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_lists_fields() {
        let err = PcosError::MissingInput {
            fields: vec!["AMH(ng/mL)".to_string(), "LH(mIU/mL)".to_string()],
        };
        assert_eq!(err.to_string(), "missing input for: AMH(ng/mL), LH(mIU/mL)");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_model_load_is_not_user_error() {
        let err = PcosError::ModelLoad("file not found".to_string());
        assert!(!err.is_user_error());
        assert!(!err.is_history_error());
    }

    #[test]
    fn test_history_failures_are_classified() {
        let io = PcosError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only file system",
        ));
        assert!(io.is_history_error());
        assert!(PcosError::MalformedHistory {
            row: 3,
            reason: "bad probability".to_string()
        }
        .is_history_error());
        assert!(!PcosError::PredictionFailed("NaN".to_string()).is_history_error());
    }
}
