//! Model Training
//!
//! Synthetic degradation data, stratified evaluation and selection of the
//! failure classifier that the inference service loads.

mod dataset;
pub mod metrics;
mod settings;
pub mod split;
mod synthetic;
mod trainer;

pub use dataset::{load_dataset, prepare_dataset, save_dataset};
pub use metrics::{accuracy, roc_auc, ConfusionMatrix};
pub use settings::{LoggingConfig, TrainingConfig};
pub use synthetic::{generate, is_failure_imminent, GeneratorConfig, LabeledReading, NormalSampler};
pub use trainer::{
    select_best, CandidateReport, Trainer, TrainerConfig, TrainingOutcome, TrainingSet,
};

use data_validator::ScaleError;
use feature_engine::FeatureError;
use inference_engine::{ArtifactError, ModelError};
use sensor_window::WindowError;
use thiserror::Error;

/// Training errors
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid reading sequence: {0}")]
    Window(#[from] WindowError),

    #[error("Feature engineering failed: {0}")]
    Feature(#[from] FeatureError),

    #[error("Scaler error: {0}")]
    Scale(#[from] ScaleError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Feature matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset format error: {0}")]
    Json(#[from] serde_json::Error),
}
