//! Model Artifact
//!
//! The bundle written by training and loaded once at service start: the
//! fitted model, its scaler, the ordered feature schema and the training
//! metrics. On disk it is a 4-byte magic, a little-endian `u16` format
//! version and a postcard body.

use crate::model::{Classifier, ModelFamily, TrainedModel};
use chrono::{DateTime, Utc};
use data_validator::StandardScaler;
use feature_engine::{ChannelMeans, FeatureConfig, FeatureSchema};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const ARTIFACT_MAGIC: [u8; 4] = *b"PMDA";
pub const ARTIFACT_FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 6;

/// Errors loading or saving an artifact
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Model artifact not found at {0}")]
    Missing(PathBuf),

    #[error("Artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt model artifact: {0}")]
    Corrupt(String),

    #[error("Unsupported artifact format version {found} (expected {expected})")]
    IncompatibleVersion { found: u16, expected: u16 },

    #[error("Inconsistent model artifact: {0}")]
    Inconsistent(String),
}

/// Held-out and cross-validated scores of the selected model
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// ROC AUC on the test split
    pub auc: f64,
    /// Accuracy at 0.5 on the test split
    pub accuracy: f64,
    /// Mean cross-validated AUC
    pub cv_mean: f64,
    /// Standard deviation of cross-validated AUC
    pub cv_std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u16,
    pub model_name: String,
    pub family: ModelFamily,
    pub model: TrainedModel,
    pub scaler: StandardScaler,
    pub schema: FeatureSchema,
    pub feature_config: FeatureConfig,
    pub channel_means: ChannelMeans,
    pub metrics: ModelMetrics,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Bundle a fitted model; fails when the parts disagree
    pub fn new(
        model: TrainedModel,
        scaler: StandardScaler,
        schema: FeatureSchema,
        feature_config: FeatureConfig,
        channel_means: ChannelMeans,
        metrics: ModelMetrics,
    ) -> Result<Self, ArtifactError> {
        let family = model.family();
        let artifact = Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_name: family.display_name().to_string(),
            family,
            model,
            scaler,
            schema,
            feature_config,
            channel_means,
            metrics,
            trained_at: Utc::now(),
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Feature count shared by schema, scaler and model
    pub fn n_features(&self) -> usize {
        self.schema.len()
    }

    /// Check the parts describe the same feature space
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::IncompatibleVersion {
                found: self.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        if !self.model.is_fitted() {
            return Err(ArtifactError::Inconsistent("model is not fitted".into()));
        }
        if self.family != self.model.family() {
            return Err(ArtifactError::Inconsistent(format!(
                "family {} does not match model {}",
                self.family,
                self.model.family()
            )));
        }

        let schema = self.schema.len();
        let scaler = self.scaler.n_features();
        let model = self.model.n_features();
        if schema != scaler || schema != model {
            return Err(ArtifactError::Inconsistent(format!(
                "feature counts differ: schema {schema}, scaler {scaler}, model {model}"
            )));
        }
        self.model
            .check_trees()
            .map_err(|e| ArtifactError::Inconsistent(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ArtifactError> {
        let body = postcard::to_allocvec(self).map_err(|e| ArtifactError::Corrupt(e.to_string()))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&ARTIFACT_MAGIC);
        bytes.extend_from_slice(&ARTIFACT_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArtifactError> {
        if bytes.len() < HEADER_LEN || bytes[..4] != ARTIFACT_MAGIC {
            return Err(ArtifactError::Corrupt("missing artifact header".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::IncompatibleVersion {
                found: version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }

        let artifact: Self = postcard::from_bytes(&bytes[HEADER_LEN..])
            .map_err(|e| ArtifactError::Corrupt(e.to_string()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Write the artifact, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ArtifactError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes)?;
        info!(
            "Saved {} artifact ({} bytes) to {}",
            self.model_name,
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let artifact = Self::from_bytes(&bytes)?;
        info!(
            "Loaded {} artifact from {} ({} features, AUC {:.4})",
            artifact.model_name,
            path.display(),
            artifact.n_features(),
            artifact.metrics.auc
        );
        Ok(artifact)
    }
}
