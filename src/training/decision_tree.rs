//! CART decision tree
//!
//! Used directly as the base learner of [`RandomForest`](super::RandomForest) and
//! [`GradientBoosting`](super::GradientBoosting). Splits are found with a sorted
//! sweep per feature, features scanned in parallel.

use crate::error::{ForgeError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// What the leaves predict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeKind {
    /// Majority class, Gini impurity
    Classifier,
    /// Mean target, squared error
    Regressor,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (None = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split (None = all)
    pub max_features: Option<usize>,
    kind: TreeKind,
    /// Sorted class values (classification)
    classes: Vec<f64>,
    n_features: usize,
}

/// Running sufficient statistics of the targets in one partition
#[derive(Clone)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<usize>,
}

impl NodeStats {
    fn empty(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0; n_classes],
        }
    }

    fn add(&mut self, y: f64, class: usize, kind: TreeKind) {
        self.count += 1;
        match kind {
            TreeKind::Classifier => self.class_counts[class] += 1,
            TreeKind::Regressor => {
                self.sum += y;
                self.sq_sum += y * y;
            }
        }
    }

    fn remove(&mut self, y: f64, class: usize, kind: TreeKind) {
        self.count -= 1;
        match kind {
            TreeKind::Classifier => self.class_counts[class] -= 1,
            TreeKind::Regressor => {
                self.sum -= y;
                self.sq_sum -= y * y;
            }
        }
    }

    fn impurity(&self, kind: TreeKind) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match kind {
            TreeKind::Classifier => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            TreeKind::Regressor => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Borrowed training data shared by the recursive builder
struct Training<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    /// Class index per row (classification), zeros otherwise
    class_of: Vec<usize>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    fn with_kind(kind: TreeKind) -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            kind,
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn new_classifier() -> Self {
        Self::with_kind(TreeKind::Classifier)
    }

    pub fn new_regressor() -> Self {
        Self::with_kind(TreeKind::Regressor)
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    /// Fit the tree; feature sampling (if any) uses a fixed seed
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        self.fit_with_rng(x, y, &mut rng)
    }

    /// Fit the tree drawing per-split feature subsets from `rng`
    pub fn fit_with_rng<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut R,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(ForgeError::target_length(n_samples, y.len()));
        }
        if n_samples == 0 {
            return Err(ForgeError::InsufficientSamples {
                required: 1,
                actual: 0,
            });
        }

        self.n_features = x.ncols();

        let class_of = match self.kind {
            TreeKind::Classifier => {
                let mut classes: Vec<f64> = y.to_vec();
                classes.sort_by(f64::total_cmp);
                classes.dedup();
                let class_of = y
                    .iter()
                    .map(|v| classes.partition_point(|c| c < v))
                    .collect();
                self.classes = classes;
                class_of
            }
            TreeKind::Regressor => vec![0; n_samples],
        };

        let data = Training { x, y, class_of };
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build(&data, &indices, 0, rng));
        Ok(self)
    }

    fn stats_of(&self, data: &Training<'_>, indices: &[usize]) -> NodeStats {
        let mut stats = NodeStats::empty(self.classes.len());
        for &i in indices {
            stats.add(data.y[i], data.class_of[i], self.kind);
        }
        stats
    }

    fn build<R: Rng>(
        &self,
        data: &Training<'_>,
        indices: &[usize],
        depth: usize,
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = self.stats_of(data, indices);
        let impurity = stats.impurity(self.kind);

        let stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || impurity <= 1e-12;

        if !stop {
            if let Some(split) = self.find_best_split(data, indices, &stats, rng) {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| data.x[[i, split.feature_idx]] <= split.threshold);

                let left = Box::new(self.build(data, &left_idx, depth + 1, rng));
                let right = Box::new(self.build(data, &right_idx, depth + 1, rng));
                return TreeNode::Split {
                    feature_idx: split.feature_idx,
                    threshold: split.threshold,
                    left,
                    right,
                    n_samples,
                };
            }
        }

        TreeNode::Leaf {
            value: self.leaf_value(&stats),
            n_samples,
        }
    }

    fn candidate_features<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut chosen = index::sample(rng, self.n_features, k).into_vec();
                chosen.sort_unstable();
                chosen
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn find_best_split<R: Rng>(
        &self,
        data: &Training<'_>,
        indices: &[usize],
        parent: &NodeStats,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let features = self.candidate_features(rng);
        let parent_impurity = parent.impurity(self.kind);

        let results: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| self.best_split_on(data, indices, parent, parent_impurity, feature_idx))
            .collect();

        // First feature wins ties so results do not depend on thread scheduling
        results.into_iter().flatten().fold(None, |best, cand| match best {
            Some(b) if b.gain >= cand.gain => Some(b),
            _ => Some(cand),
        })
    }

    fn best_split_on(
        &self,
        data: &Training<'_>,
        indices: &[usize],
        parent: &NodeStats,
        parent_impurity: f64,
        feature_idx: usize,
    ) -> Option<SplitCandidate> {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| data.x[[a, feature_idx]].total_cmp(&data.x[[b, feature_idx]]));

        let n = sorted.len();
        let mut left = NodeStats::empty(parent.class_counts.len());
        let mut right = parent.clone();
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n - 1 {
            let i = sorted[pos];
            left.add(data.y[i], data.class_of[i], self.kind);
            right.remove(data.y[i], data.class_of[i], self.kind);

            let current = data.x[[i, feature_idx]];
            let next = data.x[[sorted[pos + 1], feature_idx]];
            if next <= current {
                continue;
            }
            if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                continue;
            }

            let weighted = (left.count as f64 * left.impurity(self.kind)
                + right.count as f64 * right.impurity(self.kind))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: current + (next - current) / 2.0,
                    gain,
                });
            }
        }

        best
    }

    fn leaf_value(&self, stats: &NodeStats) -> f64 {
        match self.kind {
            TreeKind::Classifier => {
                // Most frequent class, smallest class on ties
                let mut best = 0;
                for (idx, &count) in stats.class_counts.iter().enumerate() {
                    if count > stats.class_counts[best] {
                        best = idx;
                    }
                }
                self.classes.get(best).copied().unwrap_or(0.0)
            }
            TreeKind::Regressor => {
                if stats.count == 0 {
                    0.0
                } else {
                    stats.sum / stats.count as f64
                }
            }
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(ForgeError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(ForgeError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows().into_iter().map(|row| Self::predict_row(root, row)).collect())
    }

    fn predict_row(mut node: &TreeNode, row: ArrayView1<'_, f64>) -> f64 {
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Tree depth (a lone leaf has depth 1)
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        self.root.as_ref().map_or(0, count)
    }
}
