//! Data Set Files
//!
//! Labelled readings stored as a JSON array with the same field names the
//! service accepts.

use crate::synthetic::{generate, LabeledReading};
use crate::{TrainingConfig, TrainingError};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Write readings as JSON, creating parent directories
pub fn save_dataset(path: impl AsRef<Path>, data: &[LabeledReading]) -> Result<(), TrainingError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, data)?;
    info!("Saved {} readings to {}", data.len(), path.display());
    Ok(())
}

pub fn load_dataset(path: impl AsRef<Path>) -> Result<Vec<LabeledReading>, TrainingError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let data: Vec<LabeledReading> = serde_json::from_reader(reader)?;
    info!("Loaded {} readings from {}", data.len(), path.display());
    Ok(data)
}

/// Readings to train on: the file at `input` when given, otherwise a freshly
/// generated set, written to `dataset_path` if configured
pub fn prepare_dataset(
    config: &TrainingConfig,
    input: Option<&Path>,
) -> Result<Vec<LabeledReading>, TrainingError> {
    if let Some(path) = input {
        return load_dataset(path);
    }
    let data = generate(&config.generator);
    if let Some(path) = &config.dataset_path {
        save_dataset(path, &data)?;
    }
    Ok(data)
}
