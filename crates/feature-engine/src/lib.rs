//! Feature Engineering Engine
//!
//! Turns per-machine sensor time series into fixed-order feature vectors:
//! rolling window statistics, trend deltas, a composite degradation index and
//! calendar features.

mod accumulator;
mod features;
mod schema;
mod statistics;

pub use accumulator::{engineer_readings, EngineeredRow, FeatureAccumulator};
pub use features::{ChannelMeans, FeatureConfig, FeatureVector};
pub use schema::{FeatureSchema, DAY_OF_WEEK, DEGRADATION_INDEX, HOUR};
pub use statistics::WindowStatistics;

use sensor_window::WindowError;
use thiserror::Error;

/// Errors during feature engineering
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),
    #[error("Duplicate feature in schema: {0}")]
    DuplicateFeature(String),
    #[error("Feature schema is empty")]
    EmptySchema,
    #[error("Invalid feature config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Window(#[from] WindowError),
}
