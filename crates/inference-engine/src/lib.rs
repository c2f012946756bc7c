//! Failure Inference Engine
//!
//! Tree-ensemble classifiers, the persisted model artifact and the
//! single/batch prediction service built on them.

mod artifact;
mod engine;
mod input;
pub mod model;

pub use artifact::{ArtifactError, ModelArtifact, ModelMetrics, ARTIFACT_FORMAT_VERSION, ARTIFACT_MAGIC};
pub use engine::InferenceEngine;
pub use input::{
    BatchItem, BatchOutcome, BatchPrediction, Prediction, PredictionFailure, PredictionOutcome,
    Score, SensorInput,
};
pub use model::{Classifier, ModelError, ModelFamily, TrainedModel};

use data_validator::{ScaleError, ValidationError};
use feature_engine::FeatureError;
use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid input at row {index}: {source}")]
    BatchRow {
        index: usize,
        #[source]
        source: Box<InferenceError>,
    },

    #[error("Model error: {0}")]
    Model(ModelError),

    #[error("Model artifact unavailable: {0}")]
    ArtifactLoad(#[from] ArtifactError),
}

impl From<ValidationError> for InferenceError {
    fn from(e: ValidationError) -> Self {
        InferenceError::InputValidation(e.to_string())
    }
}

impl From<FeatureError> for InferenceError {
    fn from(e: FeatureError) -> Self {
        InferenceError::InputValidation(e.to_string())
    }
}

impl From<ScaleError> for InferenceError {
    fn from(e: ScaleError) -> Self {
        match e {
            ScaleError::DimensionMismatch { expected, actual } => {
                InferenceError::DimensionMismatch { expected, actual }
            }
            other => InferenceError::InputValidation(other.to_string()),
        }
    }
}

impl From<ModelError> for InferenceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::DimensionMismatch { expected, actual } => {
                InferenceError::DimensionMismatch { expected, actual }
            }
            other => InferenceError::Model(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: InferenceError = ScaleError::DimensionMismatch {
            expected: 28,
            actual: 3,
        }
        .into();
        assert!(matches!(
            err,
            InferenceError::DimensionMismatch {
                expected: 28,
                actual: 3
            }
        ));

        let err: InferenceError = ValidationError::MissingField("presion".into()).into();
        assert_eq!(err.to_string(), "Invalid input: Missing required field: presion");
    }
}
