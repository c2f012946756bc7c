//! Boosted Tree Classifiers
//!
//! Both boosters fit trees in log-odds space under log loss.
//! `GradientBoosting` splits on the residual `y - p` and sets Newton leaf
//! values `Σ(y - p) / Σ p(1 - p)`, starting from the prior log-odds.
//! `NewtonBoosting` uses the hessian `p(1 - p)` for the split search too,
//! with L2 regularisation and a minimum child weight, starting from a zero
//! margin.

use super::tree::{RegressionTree, TreeParams, TreeTargets};
use super::{check_training_input, sigmoid, Classifier, ModelError};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Boosting hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 regularisation on leaf values
    pub lambda: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
}

impl BoostingParams {
    /// 100 stages of depth-3 trees at learning rate 0.1
    pub fn gradient_boosting() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            lambda: 0.0,
            min_child_weight: 0.0,
        }
    }

    /// 100 rounds of depth-6 trees, eta 0.3, λ = 1, min child weight 1
    pub fn newton_boosting() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter("n_estimators must be > 0".into()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.lambda < 0.0 {
            return Err(ModelError::InvalidParameter("lambda must be >= 0".into()));
        }
        Ok(())
    }
}

/// Additive tree ensemble in log-odds space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Ensemble {
    base_margin: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl Ensemble {
    fn empty(learning_rate: f64) -> Self {
        Self {
            base_margin: 0.0,
            learning_rate,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    fn margin(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.base_margin
            + self
                .trees
                .iter()
                .map(|t| self.learning_rate * t.predict(row))
                .sum::<f64>()
    }

    /// Fit stage by stage; `second_order_splits` selects the split weights
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: &[u8],
        params: &BoostingParams,
        second_order_splits: bool,
    ) {
        let n = x.nrows();
        let labels: Vec<f64> = y.iter().map(|&v| f64::from(v)).collect();
        let mut margins = vec![self.base_margin; n];
        let rows: Vec<usize> = (0..n).collect();
        let ones = vec![1.0; n];
        let tree_params = TreeParams {
            max_depth: Some(params.max_depth),
            min_child_weight: params.min_child_weight,
            lambda: params.lambda,
            ..Default::default()
        };

        self.learning_rate = params.learning_rate;
        self.trees = Vec::with_capacity(params.n_estimators);
        self.n_features = x.ncols();

        for _ in 0..params.n_estimators {
            let probs: Vec<f64> = margins.iter().map(|&m| sigmoid(m)).collect();
            let grad: Vec<f64> = labels.iter().zip(&probs).map(|(y, p)| y - p).collect();
            let hess: Vec<f64> = probs.iter().map(|p| p * (1.0 - p)).collect();

            let targets = if second_order_splits {
                TreeTargets {
                    grad: &grad,
                    hess: &hess,
                    leaf_hess: None,
                }
            } else {
                TreeTargets {
                    grad: &grad,
                    hess: &ones,
                    leaf_hess: Some(&hess),
                }
            };
            let tree = RegressionTree::fit(x, &rows, &targets, tree_params, None);

            for (i, margin) in margins.iter_mut().enumerate() {
                *margin += self.learning_rate * tree.predict(x.row(i));
            }
            self.trees.push(tree);
        }
    }
}

/// Gradient boosting with a log-odds prior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: BoostingParams,
    ensemble: Ensemble,
}

impl GradientBoosting {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            ensemble: Ensemble::empty(params.learning_rate),
            params,
        }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.ensemble.trees
    }

    /// Log-odds of the positive rate, clamped to ±5 for single-class data
    fn prior_log_odds(y: &[u8]) -> f64 {
        let positives = y.iter().filter(|&&v| v == 1).count();
        let p = positives as f64 / y.len() as f64;
        if p <= 0.0 {
            -5.0
        } else if p >= 1.0 {
            5.0
        } else {
            (p / (1.0 - p)).ln()
        }
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<(), ModelError> {
        check_training_input(x, y)?;
        self.params.validate()?;

        self.ensemble.base_margin = Self::prior_log_odds(y);
        self.ensemble.fit(x, y, &self.params, false);
        debug!(
            "Gradient boosting fitted: {} stages, prior {:.4}",
            self.ensemble.trees.len(),
            self.ensemble.base_margin
        );
        Ok(())
    }

    fn predict_probability(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        self.check_row(row)?;
        Ok(sigmoid(self.ensemble.margin(row)))
    }

    fn n_features(&self) -> usize {
        self.ensemble.n_features
    }

    fn is_fitted(&self) -> bool {
        !self.ensemble.trees.is_empty()
    }
}

/// Second-order (Newton) boosting, XGBoost-style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewtonBoosting {
    params: BoostingParams,
    ensemble: Ensemble,
}

impl NewtonBoosting {
    pub fn new(params: BoostingParams) -> Self {
        Self {
            ensemble: Ensemble::empty(params.learning_rate),
            params,
        }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.ensemble.trees
    }
}

impl Classifier for NewtonBoosting {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<(), ModelError> {
        check_training_input(x, y)?;
        self.params.validate()?;

        self.ensemble.base_margin = 0.0;
        self.ensemble.fit(x, y, &self.params, true);
        debug!("Newton boosting fitted: {} rounds", self.ensemble.trees.len());
        Ok(())
    }

    fn predict_probability(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        self.check_row(row)?;
        Ok(sigmoid(self.ensemble.margin(row)))
    }

    fn n_features(&self) -> usize {
        self.ensemble.n_features
    }

    fn is_fitted(&self) -> bool {
        !self.ensemble.trees.is_empty()
    }
}
