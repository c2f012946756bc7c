//! Service Settings
//!
//! Optional `servicio` file plus `PREDMAINT_` environment overrides, e.g.
//! `PREDMAINT_SERVER__BIND=127.0.0.1:9000`.

use crate::rate_limit::RateLimitConfig;
use alerting::AlertThresholds;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Allow any origin, for the browser dashboard
    pub permissive_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".into(),
            permissive_cors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
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
pub struct Settings {
    pub server: ServerConfig,
    pub artifact_path: PathBuf,
    /// SQLite prediction log; `None` disables logging
    pub database_url: Option<String>,
    pub alerts: AlertThresholds,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            artifact_path: PathBuf::from("models/modelo_entrenado.pmda"),
            database_url: Some("sqlite://predicciones.db".into()),
            alerts: AlertThresholds::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
            metrics: true,
        }
    }
}

impl Settings {
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
        let settings = Settings::load(Some("/nonexistent/servicio")).unwrap();
        assert_eq!(settings.server.bind, "0.0.0.0:8000");
        assert_eq!(settings.alerts, AlertThresholds::default());
        assert!(settings.rate_limit.enabled);
        assert_eq!(
            settings.artifact_path,
            PathBuf::from("models/modelo_entrenado.pmda")
        );
    }
}
