//! Ordered Feature Schema

use crate::features::FeatureConfig;
use crate::FeatureError;
use sensor_window::{SensorChannel, TIME_SINCE_MAINTENANCE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Composite degradation index feature
pub const DEGRADATION_INDEX: &str = "indice_degradacion";
/// Hour of day (0-23)
pub const HOUR: &str = "hora";
/// Day of week, Monday = 0
pub const DAY_OF_WEEK: &str = "dia_semana";

/// Ordered list of feature names a scaler/model pair was fitted with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema from explicit names (non-empty, no duplicates)
    pub fn new(names: Vec<String>) -> Result<Self, FeatureError> {
        if names.is_empty() {
            return Err(FeatureError::EmptySchema);
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(FeatureError::DuplicateFeature(name.clone()));
            }
        }
        Ok(Self { names })
    }

    /// The layout produced by the feature accumulator:
    /// raw channels, time since maintenance, per-channel rolling stats and
    /// trend, degradation index, hour and day of week.
    pub fn standard(config: &FeatureConfig) -> Self {
        let mut names = Vec::with_capacity(Self::standard_width());

        for channel in SensorChannel::ALL {
            names.push(channel.name().to_string());
        }
        names.push(TIME_SINCE_MAINTENANCE.to_string());

        for channel in SensorChannel::ALL {
            let c = channel.name();
            names.push(format!("{c}_media_{}", config.window));
            names.push(format!("{c}_std_{}", config.window));
            names.push(format!("{c}_max_{}", config.window));
            names.push(format!("{c}_min_{}", config.window));
            names.push(format!("{c}_tendencia"));
        }

        names.push(DEGRADATION_INDEX.to_string());
        names.push(HOUR.to_string());
        names.push(DAY_OF_WEEK.to_string());

        Self { names }
    }

    /// Number of features in the standard layout
    pub const fn standard_width() -> usize {
        SensorChannel::ALL.len() * 6 + 4
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a feature name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_layout() {
        let schema = FeatureSchema::standard(&FeatureConfig::default());
        assert_eq!(schema.len(), 28);
        assert_eq!(schema.len(), FeatureSchema::standard_width());
        assert_eq!(schema.names()[0], "vibracion");
        assert_eq!(schema.names()[4], "tiempo_desde_mantenimiento");
        assert_eq!(schema.names()[5], "vibracion_media_10");
        assert_eq!(schema.names()[9], "vibracion_tendencia");
        assert_eq!(schema.names()[24], "corriente_tendencia");
        assert_eq!(schema.names()[25], DEGRADATION_INDEX);
        assert_eq!(schema.names()[27], DAY_OF_WEEK);
    }

    #[test]
    fn test_window_size_in_names() {
        let config = FeatureConfig {
            window: 20,
            trend_lag: 5,
        };
        let schema = FeatureSchema::standard(&config);
        assert!(schema.contains("presion_std_20"));
        assert!(!schema.contains("presion_std_10"));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let dup = FeatureSchema::new(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(dup.unwrap_err(), FeatureError::DuplicateFeature("a".into()));
        assert_eq!(FeatureSchema::new(vec![]).unwrap_err(), FeatureError::EmptySchema);
    }
}
