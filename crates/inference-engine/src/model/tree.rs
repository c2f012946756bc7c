//! Second-Order Regression Tree
//!
//! One CART learner shared by every ensemble. A node is split where
//! `G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ)` is largest, with `G` the sum of
//! targets (gradients) and `H` the sum of split weights (hessians) on each
//! side. With unit weights and λ = 0 this is plain variance reduction.

use super::ModelError;
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Smallest gain accepted as an improvement
const MIN_GAIN: f64 = 1e-12;

/// Growth limits for one tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth, unbounded when `None`
    pub max_depth: Option<usize>,
    /// Minimum rows in a node for it to be split
    pub min_samples_split: usize,
    /// Minimum hessian sum on each side of a split
    pub min_child_weight: f64,
    /// L2 regularisation on leaf values
    pub lambda: f64,
    /// Features considered per split, all when `None`
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_child_weight: 0.0,
            lambda: 0.0,
            max_features: None,
        }
    }
}

/// Per-row fitting targets
pub struct TreeTargets<'a> {
    /// Gradient (or label) per row
    pub grad: &'a [f64],
    /// Weight per row used for split search
    pub hess: &'a [f64],
    /// Weight per row used for leaf values, `hess` when `None`
    pub leaf_hess: Option<&'a [f64]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Fitted tree stored as a node arena, root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Builder<'a, 't, 'r> {
    x: ArrayView2<'a, f64>,
    targets: &'t TreeTargets<'t>,
    params: TreeParams,
    rng: Option<&'r mut StdRng>,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree on the given rows (duplicates allowed, e.g. a bootstrap
    /// sample). Feature subsampling needs `rng`; without it every feature
    /// is searched.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        rows: &[usize],
        targets: &TreeTargets<'_>,
        params: TreeParams,
        rng: Option<&mut StdRng>,
    ) -> Self {
        let mut builder = Builder {
            x,
            targets,
            params,
            rng,
            nodes: Vec::new(),
        };
        let mut rows = rows.to_vec();
        builder.grow(&mut rows, 0);
        Self {
            nodes: builder.nodes,
        }
    }

    /// Leaf value for one row
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Check a deserialized tree can be walked on rows of `n_features`.
    /// Children always sit after their parent in the arena, so a tree that
    /// passes cannot loop or index out of bounds.
    pub(crate) fn check(&self, n_features: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::MalformedTree("tree has no nodes".into()));
        }
        if let Some(feature) = self.max_feature() {
            if feature >= n_features {
                return Err(ModelError::MalformedTree(format!(
                    "split on feature {feature} but the model has {n_features} features"
                )));
            }
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                for child in [*left, *right] {
                    if child <= idx || child >= len {
                        return Err(ModelError::MalformedTree(format!(
                            "node {idx} points to node {child} of {len}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Largest feature index referenced by a split
    pub(crate) fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }
}

impl Builder<'_, '_, '_> {
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: self.leaf_value(rows),
        });

        let depth_left = self.params.max_depth.map_or(true, |max| depth < max);
        if !depth_left || rows.len() < self.params.min_samples_split.max(2) {
            return idx;
        }

        let Some(best) = self.best_split(rows) else {
            return idx;
        };

        let x = self.x;
        let mut split_at = 0;
        for i in 0..rows.len() {
            if x[[rows[i], best.feature]] <= best.threshold {
                rows.swap(i, split_at);
                split_at += 1;
            }
        }
        if split_at == 0 || split_at == rows.len() {
            return idx;
        }

        let (left_rows, right_rows) = rows.split_at_mut(split_at);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let hess = self.targets.leaf_hess.unwrap_or(self.targets.hess);
        let g: f64 = rows.iter().map(|&r| self.targets.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| hess[r]).sum();
        let denom = h + self.params.lambda;
        if denom.abs() < 1e-150 {
            0.0
        } else {
            g / denom
        }
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.x.ncols();
        match (self.params.max_features, self.rng.as_deref_mut()) {
            (Some(k), Some(rng)) if k < n_features => {
                let mut picked = rand::seq::index::sample(rng, n_features, k.max(1)).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..n_features).collect(),
        }
    }

    fn best_split(&mut self, rows: &[usize]) -> Option<BestSplit> {
        let grad = self.targets.grad;
        let hess = self.targets.hess;
        let lambda = self.params.lambda;
        let mcw = self.params.min_child_weight;
        let x = self.x;

        let g_total: f64 = rows.iter().map(|&r| grad[r]).sum();
        let h_total: f64 = rows.iter().map(|&r| hess[r]).sum();
        let parent_score = score(g_total, h_total, lambda);

        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = rows.to_vec();

        for feature in self.candidate_features() {
            let column = x.column(feature);
            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for i in 0..order.len() - 1 {
                let r = order[i];
                g_left += grad[r];
                h_left += hess[r];

                let here = column[r];
                let next = column[order[i + 1]];
                if next <= here {
                    continue;
                }

                let h_right = h_total - h_left;
                if h_left < mcw || h_right < mcw {
                    continue;
                }

                let gain = score(g_left, h_left, lambda) + score(g_total - g_left, h_right, lambda)
                    - parent_score;
                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}

fn score(g: f64, h: f64, lambda: f64) -> f64 {
    let denom = h + lambda;
    if denom <= 0.0 {
        0.0
    } else {
        g * g / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn unit_targets(y: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (y.to_vec(), vec![1.0; y.len()])
    }

    #[test]
    fn test_separable_split() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let (grad, hess) = unit_targets(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let targets = TreeTargets {
            grad: &grad,
            hess: &hess,
            leaf_hess: None,
        };
        let rows: Vec<usize> = (0..6).collect();
        let tree = RegressionTree::fit(x.view(), &rows, &targets, TreeParams::default(), None);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(array![2.5].view()), 0.0);
        assert_eq!(tree.predict(array![11.0].view()), 1.0);
        // Threshold sits halfway between 3 and 10
        assert_eq!(tree.predict(array![6.4].view()), 0.0);
        assert_eq!(tree.predict(array![6.6].view()), 1.0);
    }

    #[test]
    fn test_check_rejects_bad_indices() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [10.0, 0.0], [11.0, 0.0]];
        let (grad, hess) = unit_targets(&[0.0, 0.0, 1.0, 1.0]);
        let targets = TreeTargets {
            grad: &grad,
            hess: &hess,
            leaf_hess: None,
        };
        let tree = RegressionTree::fit(x.view(), &[0, 1, 2, 3], &targets, TreeParams::default(), None);
        assert!(tree.check(2).is_ok());
        assert!(matches!(tree.check(0), Err(ModelError::MalformedTree(_))));

        let mut bad_child = tree.clone();
        if let Node::Split { left, .. } = &mut bad_child.nodes[0] {
            *left = 0;
        }
        assert!(matches!(bad_child.check(2), Err(ModelError::MalformedTree(_))));

        let mut out_of_range = tree.clone();
        if let Node::Split { right, .. } = &mut out_of_range.nodes[0] {
            *right = 99;
        }
        assert!(out_of_range.check(2).is_err());

        let empty = RegressionTree { nodes: Vec::new() };
        assert!(empty.check(2).is_err());
    }

    #[test]
    fn test_constant_target_is_a_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let (grad, hess) = unit_targets(&[1.0, 1.0, 1.0]);
        let targets = TreeTargets {
            grad: &grad,
            hess: &hess,
            leaf_hess: None,
        };
        let tree = RegressionTree::fit(x.view(), &[0, 1, 2], &targets, TreeParams::default(), None);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(array![5.0].view()), 1.0);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let (grad, hess) = unit_targets(&[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        let targets = TreeTargets {
            grad: &grad,
            hess: &hess,
            leaf_hess: None,
        };
        let params = TreeParams {
            max_depth: Some(2),
            ..Default::default()
        };
        let rows: Vec<usize> = (0..8).collect();
        let tree = RegressionTree::fit(x.view(), &rows, &targets, params, None);
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_lambda_shrinks_leaves() {
        let x = array![[1.0], [2.0]];
        let grad = vec![1.0, 1.0];
        let hess = vec![1.0, 1.0];
        let targets = TreeTargets {
            grad: &grad,
            hess: &hess,
            leaf_hess: None,
        };
        let params = TreeParams {
            lambda: 2.0,
            ..Default::default()
        };
        let tree = RegressionTree::fit(x.view(), &[0, 1], &targets, params, None);
        assert!((tree.predict(array![1.0].view()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_separate_leaf_weights() {
        let x = array![[1.0], [2.0]];
        let grad = vec![0.5, 0.5];
        let hess = vec![1.0, 1.0];
        let leaf = vec![0.25, 0.25];
        let targets = TreeTargets {
            grad: &grad,
            hess: &hess,
            leaf_hess: Some(&leaf),
        };
        let tree = RegressionTree::fit(x.view(), &[0, 1], &targets, TreeParams::default(), None);
        assert!((tree.predict(array![1.0].view()) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_feature_subsampling_is_seeded() {
        let x = array![
            [1.0, 5.0, 0.0],
            [2.0, 4.0, 1.0],
            [3.0, 3.0, 0.0],
            [4.0, 2.0, 1.0],
            [5.0, 1.0, 0.0],
            [6.0, 0.0, 1.0]
        ];
        let (grad, hess) = unit_targets(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let targets = TreeTargets {
            grad: &grad,
            hess: &hess,
            leaf_hess: None,
        };
        let params = TreeParams {
            max_features: Some(1),
            ..Default::default()
        };
        let rows: Vec<usize> = (0..6).collect();

        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = RegressionTree::fit(x.view(), &rows, &targets, params, Some(&mut rng_a));
        let b = RegressionTree::fit(x.view(), &rows, &targets, params, Some(&mut rng_b));
        assert_eq!(a, b);
    }
}
