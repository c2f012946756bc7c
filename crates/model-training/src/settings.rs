//! Training Settings
//!
//! Read from an optional file plus `PREDMAINT_` environment variables,
//! e.g. `PREDMAINT_TRAINER__N_ESTIMATORS=50`.

use crate::synthetic::GeneratorConfig;
use crate::trainer::TrainerConfig;
use config::{Config, ConfigError, Environment, File};
use feature_engine::FeatureConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub generator: GeneratorConfig,
    pub features: FeatureConfig,
    pub trainer: TrainerConfig,
    pub artifact_path: PathBuf,
    /// Where to write the generated data set, if anywhere
    pub dataset_path: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            features: FeatureConfig::default(),
            trainer: TrainerConfig::default(),
            artifact_path: PathBuf::from("models/modelo_entrenado.pmda"),
            dataset_path: Some(PathBuf::from("data/datos_sinteticos.json")),
            logging: LoggingConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Load settings; a missing file falls back to defaults
    pub fn load(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::with_name(file).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix("PREDMAINT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.generator.n_samples, 10_000);
        assert_eq!(config.trainer.cv_folds, 5);
        assert_eq!(config.trainer.test_fraction, 0.2);
        assert_eq!(config.features.window, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_without_file() {
        let config = TrainingConfig::load(Some("/nonexistent/entrenamiento")).unwrap();
        assert_eq!(config.trainer.random_state, 42);
        assert_eq!(config.artifact_path, PathBuf::from("models/modelo_entrenado.pmda"));
    }
}
