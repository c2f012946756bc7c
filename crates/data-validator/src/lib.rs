//! Data Validation and Normalization
//!
//! Provides validation of named sensor inputs and the fitted standard scaler
//! applied identically at training and inference time.

mod error;
mod normalizer;
mod validator;

pub use error::{ScaleError, ValidationError};
pub use normalizer::{ScalerParameters, StandardScaler};
pub use validator::{FieldRule, ValidationConfig, Validator};
