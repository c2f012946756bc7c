//! Failure Classifiers
//!
//! Three tree-ensemble families behind one `Classifier` trait, and the
//! serializable `TrainedModel` that an artifact carries.

mod boosting;
mod forest;
mod tree;

pub use boosting::{BoostingParams, GradientBoosting, NewtonBoosting};
pub use forest::{ForestParams, RandomForest};
pub use tree::{RegressionTree, TreeParams, TreeTargets};

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors fitting or applying a classifier
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Feature matrix has {rows} rows but {labels} labels were given")]
    LabelCountMismatch { rows: usize, labels: usize },

    #[error("Labels must be 0 or 1, got {0}")]
    InvalidLabel(u8),

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Dimension mismatch: model expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Malformed tree: {0}")]
    MalformedTree(String),
}

/// Binary classifier producing a failure probability
pub trait Classifier {
    /// Fit on rows of `x` with 0/1 labels
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<(), ModelError>;

    /// Probability of the positive class for one row, in [0, 1]
    fn predict_probability(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError>;

    /// Feature count seen at fit time, 0 before fitting
    fn n_features(&self) -> usize;

    fn is_fitted(&self) -> bool;

    fn predict_probabilities(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, ModelError> {
        x.rows()
            .into_iter()
            .map(|row| self.predict_probability(row))
            .collect()
    }

    /// Reject rows that do not match the fitted width
    fn check_row(&self, row: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted);
        }
        if row.len() != self.n_features() {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        Ok(())
    }
}

pub(crate) fn check_training_input(x: ArrayView2<'_, f64>, y: &[u8]) -> Result<(), ModelError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::LabelCountMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    if let Some(&bad) = y.iter().find(|&&v| v > 1) {
        return Err(ModelError::InvalidLabel(bad));
    }
    Ok(())
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Candidate model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelFamily {
    RandomForest,
    GradientBoosting,
    XgBoost,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::RandomForest,
        ModelFamily::GradientBoosting,
        ModelFamily::XgBoost,
    ];

    /// Display name, also reported as `modelo_utilizado`
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::GradientBoosting => "Gradient Boosting",
            ModelFamily::XgBoost => "XGBoost",
        }
    }

    /// Unfitted model with default hyperparameters
    pub fn build(&self, random_state: u64) -> TrainedModel {
        match self {
            ModelFamily::RandomForest => TrainedModel::RandomForest(RandomForest::new(ForestParams {
                random_state,
                ..Default::default()
            })),
            ModelFamily::GradientBoosting => TrainedModel::GradientBoosting(GradientBoosting::new(
                BoostingParams::gradient_boosting(),
            )),
            ModelFamily::XgBoost => {
                TrainedModel::XgBoost(NewtonBoosting::new(BoostingParams::newton_boosting()))
            }
        }
    }

    /// Unfitted model with `n_estimators` trees instead of the default
    pub fn build_with_estimators(&self, random_state: u64, n_estimators: usize) -> TrainedModel {
        match self {
            ModelFamily::RandomForest => TrainedModel::RandomForest(RandomForest::new(ForestParams {
                n_estimators,
                random_state,
                ..Default::default()
            })),
            ModelFamily::GradientBoosting => {
                let mut params = BoostingParams::gradient_boosting();
                params.n_estimators = n_estimators;
                TrainedModel::GradientBoosting(GradientBoosting::new(params))
            }
            ModelFamily::XgBoost => {
                let mut params = BoostingParams::newton_boosting();
                params.n_estimators = n_estimators;
                TrainedModel::XgBoost(NewtonBoosting::new(params))
            }
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A model of any family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainedModel {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    XgBoost(NewtonBoosting),
}

impl TrainedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            TrainedModel::RandomForest(_) => ModelFamily::RandomForest,
            TrainedModel::GradientBoosting(_) => ModelFamily::GradientBoosting,
            TrainedModel::XgBoost(_) => ModelFamily::XgBoost,
        }
    }

    /// Every tree of the ensemble
    pub fn trees(&self) -> &[RegressionTree] {
        match self {
            TrainedModel::RandomForest(m) => m.trees(),
            TrainedModel::GradientBoosting(m) => m.trees(),
            TrainedModel::XgBoost(m) => m.trees(),
        }
    }

    /// Check every tree against the model's feature count
    pub fn check_trees(&self) -> Result<(), ModelError> {
        let n_features = self.n_features();
        for (i, tree) in self.trees().iter().enumerate() {
            tree.check(n_features).map_err(|e| match e {
                ModelError::MalformedTree(msg) => ModelError::MalformedTree(format!("tree {i}: {msg}")),
                other => other,
            })?;
        }
        Ok(())
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::XgBoost(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::RandomForest(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::XgBoost(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<(), ModelError> {
        self.inner_mut().fit(x, y)
    }

    fn predict_probability(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        self.inner().predict_probability(row)
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn is_fitted(&self) -> bool {
        self.inner().is_fitted()
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::two_blobs;
    use super::*;

    #[test]
    fn test_family_names() {
        assert_eq!(ModelFamily::RandomForest.to_string(), "Random Forest");
        assert_eq!(ModelFamily::XgBoost.display_name(), "XGBoost");
    }

    #[test]
    fn test_trained_model_dispatch() {
        let (x, y) = two_blobs(20);
        for family in ModelFamily::ALL {
            let mut model = family.build_with_estimators(42, 5);
            assert!(!model.is_fitted());
            model.fit(x.view(), &y).unwrap();
            assert_eq!(model.family(), family);
            assert_eq!(model.n_features(), 2);

            let wrong = ndarray::array![1.0, 2.0, 3.0];
            assert_eq!(
                model.predict_probability(wrong.view()).unwrap_err(),
                ModelError::DimensionMismatch {
                    expected: 2,
                    actual: 3
                }
            );
        }
    }

    #[test]
    fn test_training_input_checks() {
        let (x, _) = two_blobs(3);
        let mut model = ModelFamily::RandomForest.build(42);
        assert_eq!(
            model.fit(x.view(), &[0, 1]).unwrap_err(),
            ModelError::LabelCountMismatch { rows: 6, labels: 2 }
        );
        assert_eq!(
            model.fit(x.view(), &[0, 1, 2, 0, 1, 0]).unwrap_err(),
            ModelError::InvalidLabel(2)
        );
    }
}
