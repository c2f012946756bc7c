//! Random Forest Classifier
//!
//! Bagged regression trees on 0/1 labels. Each tree sees a bootstrap sample
//! and `√d` candidate features per split; the failure probability is the
//! mean leaf value over trees.

use super::tree::{RegressionTree, TreeParams, TreeTargets};
use super::{check_training_input, Classifier, ModelError};
use ndarray::{ArrayView1, ArrayView2};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

/// Draw `n` row indices with replacement
fn bootstrap_sample(n: usize, rng: &mut StdRng) -> Vec<usize> {
    let dist = Uniform::from(0..n);
    (0..n).map(|_| dist.sample(rng)).collect()
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[u8]) -> Result<(), ModelError> {
        check_training_input(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(ModelError::InvalidParameter("n_estimators must be > 0".into()));
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let labels: Vec<f64> = y.iter().map(|&v| f64::from(v)).collect();
        let ones = vec![1.0; n_samples];
        let targets = TreeTargets {
            grad: &labels,
            hess: &ones,
            leaf_hess: None,
        };
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            max_features: Some(((n_features as f64).sqrt() as usize).max(1)),
            ..Default::default()
        };

        self.trees = Vec::with_capacity(self.params.n_estimators);
        for i in 0..self.params.n_estimators {
            let mut rng = StdRng::seed_from_u64(self.params.random_state.wrapping_add(i as u64));
            let rows = bootstrap_sample(n_samples, &mut rng);
            let tree = RegressionTree::fit(x, &rows, &targets, tree_params, Some(&mut rng));
            self.trees.push(tree);
        }
        self.n_features = n_features;

        debug!(
            "Random forest fitted: {} trees on {} x {}",
            self.trees.len(),
            n_samples,
            n_features
        );
        Ok(())
    }

    fn predict_probability(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        self.check_row(row)?;
        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        Ok((sum / self.trees.len() as f64).clamp(0.0, 1.0))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
