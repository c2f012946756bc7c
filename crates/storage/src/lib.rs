//! Storage Layer
//!
//! SQLite log of served predictions, used for the dashboard statistics.

mod repository;

pub use repository::{PredictionLog, PredictionRecord, PredictionStatistics, MAX_RECENT};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
}
