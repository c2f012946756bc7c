//! Alerting System
//!
//! Maps a failure probability to an alert level and a maintenance
//! recommendation, and tallies levels over a batch.

mod policy;

pub use policy::{AlertLevel, AlertPolicy, AlertSummary, AlertThresholds};

use thiserror::Error;

/// Alerting configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlertError {
    #[error("Invalid thresholds: warning {warning} and critical {critical} must satisfy 0 <= warning < critical <= 1")]
    InvalidThresholds { warning: f64, critical: f64 },
}
