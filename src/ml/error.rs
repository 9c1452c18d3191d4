//! Error types for the inference pipeline

use crate::error::AppError;
use serde_json::Value;
use std::path::PathBuf;

/// Errors raised while loading the model artifact bundle
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// A required artifact file does not exist
    #[error("Artifact missing: {}", .0.display())]
    ArtifactMissing(PathBuf),

    /// An artifact exists but cannot be used
    #[error("Artifact corrupt ({}): {reason}", .path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },
}

impl ArtifactError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ArtifactError::ArtifactCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the feature validator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A schema feature is absent from the request
    #[error("Missing required feature: '{0}'")]
    MissingFeature(String),

    /// A feature value is not a finite real number
    #[error("Feature '{name}' must be a finite number, got {value}")]
    NonNumericFeature { name: String, value: Value },

    /// A batch element is not a JSON object of features
    #[error("Expected an object of features, got {0}")]
    NotAnObject(&'static str),
}

/// Errors raised by a single pass through validate, scale and predict
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unknown model identifier: '{0}'")]
    UnknownModelIdentifier(String),

    /// Input length disagrees with the fitted dimensionality.
    /// Unreachable when the validator ran first.
    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A loaded classifier failed at inference time
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}

impl PipelineError {
    /// True for contract violations inside the pipeline, false for caller mistakes
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            PipelineError::DimensionMismatch { .. } | PipelineError::InferenceFailed(_)
        )
    }

    /// Label used for structured logs and the error metric
    pub fn error_class(&self) -> &'static str {
        if self.is_internal() {
            "internal"
        } else {
            "user_input"
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(inner) => inner.into(),
            PipelineError::UnknownModelIdentifier(id) => AppError::UnknownModel(id),
            internal @ (PipelineError::DimensionMismatch { .. }
            | PipelineError::InferenceFailed(_)) => AppError::Internal(internal.to_string()),
        }
    }
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        AppError::ModelsUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_dimension_mismatch_is_internal() {
        let err = PipelineError::DimensionMismatch {
            expected: 52,
            actual: 2,
        };
        assert!(err.is_internal());
        assert_eq!(err.error_class(), "internal");

        let app: AppError = err.into();
        assert_eq!(app.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_user_errors_map_to_bad_request() {
        let missing: PipelineError = ValidationError::MissingFeature("packets".into()).into();
        assert!(!missing.is_internal());
        assert_eq!(missing.error_class(), "user_input");
        assert_eq!(AppError::from(missing).status_code(), StatusCode::BAD_REQUEST);

        let unknown = PipelineError::UnknownModelIdentifier("svm".into());
        let app = AppError::from(unknown);
        assert_eq!(app.error_code(), "UNKNOWN_MODEL");
    }

    #[test]
    fn test_non_numeric_message_names_field_and_value() {
        let err = ValidationError::NonNumericFeature {
            name: "duration".into(),
            value: Value::String("fast".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("duration"));
        assert!(msg.contains("\"fast\""));
    }

    #[test]
    fn test_artifact_error_maps_to_unavailable() {
        let err = ArtifactError::ArtifactMissing(PathBuf::from("/models/knn.json"));
        assert!(err.to_string().contains("knn.json"));
        assert_eq!(
            AppError::from(err).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
