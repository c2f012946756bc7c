//! Alert Policy Implementation

use crate::AlertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Alert level of one prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "ADVERTENCIA")]
    Warning,
    #[serde(rename = "CRÍTICO")]
    Critical,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 3] = [AlertLevel::Critical, AlertLevel::Warning, AlertLevel::Normal];

    /// Wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "NORMAL",
            AlertLevel::Warning => "ADVERTENCIA",
            AlertLevel::Critical => "CRÍTICO",
        }
    }

    /// Parse a wire label
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == label)
    }

    /// Maintenance recommendation for this level
    pub fn recommendation(&self) -> &'static str {
        match self {
            AlertLevel::Critical => {
                "🚨 MANTENIMIENTO REQUERIDO INMEDIATAMENTE. Parar equipo y realizar mantenimiento correctivo."
            }
            AlertLevel::Warning => {
                "⚠️ Programar mantenimiento preventivo. Monitorear estrechamente los parámetros."
            }
            AlertLevel::Normal => "✅ Operación normal. Continuar monitoreo rutinario.",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Lower bound (inclusive) of ADVERTENCIA
    #[serde(rename = "advertencia", alias = "warning")]
    pub warning: f64,
    /// Lower bound (inclusive) of CRÍTICO
    #[serde(rename = "critico", alias = "critical")]
    pub critical: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            warning: 0.3,
            critical: 0.7,
        }
    }
}

impl AlertThresholds {
    pub fn new(warning: f64, critical: f64) -> Result<Self, AlertError> {
        let thresholds = Self { warning, critical };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Require 0 <= warning < critical <= 1
    pub fn validate(&self) -> Result<(), AlertError> {
        let ok = self.warning >= 0.0 && self.warning < self.critical && self.critical <= 1.0;
        if ok {
            Ok(())
        } else {
            Err(AlertError::InvalidThresholds {
                warning: self.warning,
                critical: self.critical,
            })
        }
    }
}

/// Maps failure probabilities to alert levels
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertPolicy {
    thresholds: AlertThresholds,
}

impl AlertPolicy {
    pub fn new(thresholds: AlertThresholds) -> Result<Self, AlertError> {
        thresholds.validate()?;
        info!(
            "Alert policy: warning >= {}, critical >= {}",
            thresholds.warning, thresholds.critical
        );
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> AlertThresholds {
        self.thresholds
    }

    /// Alert level for a probability. NaN is treated as critical.
    pub fn level(&self, probability: f64) -> AlertLevel {
        if probability.is_nan() {
            debug!("NaN failure probability, classifying as critical");
            return AlertLevel::Critical;
        }
        if probability >= self.thresholds.critical {
            AlertLevel::Critical
        } else if probability >= self.thresholds.warning {
            AlertLevel::Warning
        } else {
            AlertLevel::Normal
        }
    }

    /// Alert level and recommendation for a probability
    pub fn classify(&self, probability: f64) -> (AlertLevel, &'static str) {
        let level = self.level(probability);
        (level, level.recommendation())
    }
}

/// Count of predictions per alert level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    #[serde(rename = "CRÍTICO")]
    pub critical: usize,
    #[serde(rename = "ADVERTENCIA")]
    pub warning: usize,
    #[serde(rename = "NORMAL")]
    pub normal: usize,
}

impl AlertSummary {
    pub fn record(&mut self, level: AlertLevel) {
        match level {
            AlertLevel::Critical => self.critical += 1,
            AlertLevel::Warning => self.warning += 1,
            AlertLevel::Normal => self.normal += 1,
        }
    }

    pub fn count(&self, level: AlertLevel) -> usize {
        match level {
            AlertLevel::Critical => self.critical,
            AlertLevel::Warning => self.warning,
            AlertLevel::Normal => self.normal,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.normal
    }
}

impl FromIterator<AlertLevel> for AlertSummary {
    fn from_iter<I: IntoIterator<Item = AlertLevel>>(iter: I) -> Self {
        let mut summary = Self::default();
        for level in iter {
            summary.record(level);
        }
        summary
    }
}
