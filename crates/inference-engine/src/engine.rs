//! Inference Engine Implementation
//!
//! Validation, feature assembly, scaling, scoring and alert classification
//! over one immutable artifact. Shared read-only between request handlers.

use crate::artifact::ModelArtifact;
use crate::input::{
    BatchItem, BatchOutcome, BatchPrediction, Prediction, PredictionFailure, PredictionOutcome,
    Score, SensorInput,
};
use crate::model::Classifier;
use crate::InferenceError;
use alerting::{AlertPolicy, AlertSummary, AlertThresholds};
use chrono::Utc;
use data_validator::Validator;
use feature_engine::{engineer_readings, FeatureSchema, FeatureVector};
use ndarray::ArrayView1;
use sensor_window::SensorReading;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Failure predictor over a loaded artifact
pub struct InferenceEngine {
    artifact: Arc<ModelArtifact>,
    schema: Arc<FeatureSchema>,
    policy: AlertPolicy,
    validator: Validator,
}

impl InferenceEngine {
    /// Create an engine from a validated artifact
    pub fn new(artifact: ModelArtifact, policy: AlertPolicy) -> Result<Self, InferenceError> {
        artifact.validate()?;
        info!(
            "Inference engine ready: {} over {} features",
            artifact.model_name,
            artifact.n_features()
        );
        Ok(Self {
            schema: Arc::new(artifact.schema.clone()),
            artifact: Arc::new(artifact),
            policy,
            validator: Validator::default(),
        })
    }

    /// Load the artifact from disk
    pub fn load(path: impl AsRef<Path>, policy: AlertPolicy) -> Result<Self, InferenceError> {
        let artifact = ModelArtifact::load(path)?;
        Self::new(artifact, policy)
    }

    /// Replace the input validator
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn model_name(&self) -> &str {
        &self.artifact.model_name
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.policy.thresholds()
    }

    /// Score an assembled feature vector
    pub fn score_features(&self, features: &FeatureVector) -> Result<Score, InferenceError> {
        if features.schema().names() != self.schema.names() {
            if features.len() != self.schema.len() {
                return Err(InferenceError::DimensionMismatch {
                    expected: self.schema.len(),
                    actual: features.len(),
                });
            }
            return Err(InferenceError::InputValidation(
                "feature names or order differ from the trained model".into(),
            ));
        }

        let scaled = self.artifact.scaler.transform(features.values())?;
        let probability = self
            .artifact
            .model
            .predict_probability(ArrayView1::from(scaled.as_slice()))?;
        let (level, recommendation) = self.policy.classify(probability);

        Ok(Score {
            probability,
            level,
            recommendation,
        })
    }

    /// Validate and score one named input
    pub fn try_predict_one(&self, input: &SensorInput) -> Result<Score, InferenceError> {
        self.validator.validate_fields(input.fields())?;
        let features = FeatureVector::from_named(self.schema.clone(), input.fields())?;
        self.score_features(&features)
    }

    /// Predict one input; failures are returned as a failure payload
    pub fn predict_one(&self, input: &SensorInput) -> PredictionOutcome {
        let start = Instant::now();
        match self.try_predict_one(input) {
            Ok(score) => {
                debug!(
                    "Predicted p={:.4} ({}) in {:?}",
                    score.probability,
                    score.level,
                    start.elapsed()
                );
                PredictionOutcome::Success(self.prediction(score))
            }
            Err(e) => {
                warn!("Prediction failed: {}", e);
                PredictionOutcome::Failure(PredictionFailure::new(e.to_string()))
            }
        }
    }

    /// Score every row; the first failing row fails the whole batch
    pub fn try_predict_batch(&self, inputs: &[SensorInput]) -> Result<Vec<Score>, InferenceError> {
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                self.try_predict_one(input).map_err(|e| InferenceError::BatchRow {
                    index,
                    source: Box::new(e),
                })
            })
            .collect()
    }

    /// Predict a batch with a per-level summary
    pub fn predict_batch(&self, inputs: &[SensorInput]) -> BatchOutcome {
        let start = Instant::now();
        let scores = match self.try_predict_batch(inputs) {
            Ok(scores) => scores,
            Err(e) => {
                warn!("Batch prediction failed: {}", e);
                return BatchOutcome::Failure(PredictionFailure::new(e.to_string()));
            }
        };

        let timestamp = Utc::now();
        let summary: AlertSummary = scores.iter().map(|s| s.level).collect();
        let predictions = scores
            .iter()
            .enumerate()
            .map(|(index, score)| BatchItem {
                index,
                probability: score.probability,
                level: score.level,
                recommendation: score.recommendation.to_string(),
                model_name: self.artifact.model_name.clone(),
                timestamp,
            })
            .collect();

        info!(
            "Batch of {} scored in {:?}: {} critical, {} warning, {} normal",
            inputs.len(),
            start.elapsed(),
            summary.critical,
            summary.warning,
            summary.normal
        );

        BatchOutcome::Success(BatchPrediction {
            success: true,
            total: inputs.len(),
            predictions,
            summary,
            thresholds: self.thresholds(),
        })
    }

    /// Engineer features from raw readings with the artifact's window
    /// settings and channel means, then score each one in input order
    pub fn score_readings(&self, readings: &[SensorReading]) -> Result<Vec<Score>, InferenceError> {
        let vectors = engineer_readings(
            readings,
            self.artifact.feature_config,
            self.artifact.channel_means,
        )?;
        vectors
            .iter()
            .map(|features| self.score_features(features))
            .collect()
    }

    fn prediction(&self, score: Score) -> Prediction {
        Prediction {
            success: true,
            probability: score.probability,
            level: score.level,
            recommendation: score.recommendation.to_string(),
            model_name: self.artifact.model_name.clone(),
            timestamp: Utc::now(),
            thresholds: self.thresholds(),
        }
    }
}
