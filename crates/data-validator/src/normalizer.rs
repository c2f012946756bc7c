//! Feature Standardization
//!
//! Z-score scaling fitted once on the training rows. The fitted parameters
//! travel with the model so inference applies the identical transform.

use crate::error::ScaleError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fitted per-column mean and scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParameters {
    /// Column means
    pub mean: Vec<f64>,
    /// Column population standard deviation (1.0 where it is zero)
    pub scale: Vec<f64>,
}

/// Standard scaler: `(x - mean) / scale` per column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    params: ScalerParameters,
}

impl StandardScaler {
    /// Fit on rows of equal width
    pub fn fit<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, ScaleError> {
        let width = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        if width == 0 {
            return Err(ScaleError::EmptyInput);
        }

        let mut sums = vec![0.0; width];
        for row in rows {
            let row = row.as_ref();
            if row.len() != width {
                return Err(ScaleError::DimensionMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            for (sum, v) in sums.iter_mut().zip(row) {
                *sum += v;
            }
        }

        let n = rows.len() as f64;
        let mean: Vec<f64> = sums.into_iter().map(|s| s / n).collect();

        let mut sq = vec![0.0; width];
        for row in rows {
            for ((acc, v), m) in sq.iter_mut().zip(row.as_ref()).zip(&mean) {
                *acc += (v - m) * (v - m);
            }
        }
        let scale = sq
            .into_iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > 0.0 && std.is_finite() {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        debug!("Fitted scaler on {} rows x {} features", rows.len(), width);
        Ok(Self {
            params: ScalerParameters { mean, scale },
        })
    }

    /// Rebuild from stored parameters
    pub fn from_parameters(params: ScalerParameters) -> Result<Self, ScaleError> {
        if params.mean.len() != params.scale.len() {
            return Err(ScaleError::DimensionMismatch {
                expected: params.mean.len(),
                actual: params.scale.len(),
            });
        }
        if params.mean.is_empty() {
            return Err(ScaleError::EmptyInput);
        }
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &ScalerParameters {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.params.mean.len()
    }

    /// Scale one row
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ScaleError> {
        if row.len() != self.n_features() {
            return Err(ScaleError::DimensionMismatch {
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(&self.params.mean)
            .zip(&self.params.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }

    /// Scale many rows
    pub fn transform_rows<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Vec<Vec<f64>>, ScaleError> {
        rows.iter().map(|r| self.transform(r.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fit_population_std() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.parameters().mean, vec![2.0, 10.0]);
        // Population std of [1, 3] is 1; constant column scales by 1
        assert_eq!(scaler.parameters().scale, vec![1.0, 1.0]);

        let scaled = scaler.transform(&[3.0, 12.0]).unwrap();
        assert_eq!(scaled, vec![1.0, 2.0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(
            scaler.transform(&[1.0]).unwrap_err(),
            ScaleError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        );
    }

    #[test]
    fn test_ragged_and_empty_fit() {
        let rows: Vec<Vec<f64>> = vec![];
        assert_eq!(StandardScaler::fit(&rows).unwrap_err(), ScaleError::EmptyInput);

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(StandardScaler::fit(&ragged).is_err());
    }

    #[test]
    fn test_from_parameters() {
        let params = ScalerParameters {
            mean: vec![0.0],
            scale: vec![2.0],
        };
        let scaler = StandardScaler::from_parameters(params).unwrap();
        assert_eq!(scaler.transform(&[4.0]).unwrap(), vec![2.0]);

        let bad = ScalerParameters {
            mean: vec![0.0, 1.0],
            scale: vec![1.0],
        };
        assert!(StandardScaler::from_parameters(bad).is_err());
    }

    proptest! {
        #[test]
        fn prop_transform_is_deterministic(
            rows in prop::collection::vec(prop::collection::vec(-1e3f64..1e3, 3), 1..20),
            probe in prop::collection::vec(-1e3f64..1e3, 3),
        ) {
            let scaler = StandardScaler::fit(&rows).unwrap();
            let first = scaler.transform(&probe).unwrap();
            let second = scaler.transform(&probe).unwrap();
            prop_assert_eq!(first, second);
            prop_assert!(scaler.parameters().scale.iter().all(|s| *s > 0.0));
        }
    }
}
