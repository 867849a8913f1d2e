use std::cmp::Ordering;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::model::{DecisionTree, MODEL_VERSION, RandomForestModel, TreeNode};

/// Number of candidate features examined per split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least one.
    Sqrt,
    /// `floor(log2(n_features))`, at least one.
    Log2,
    /// Every feature.
    All,
    /// Fixed count, clamped to `[1, n_features]`.
    Count(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete candidate count for `n_features` columns.
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features.max(1);
        let k = match self {
            Self::Sqrt => (n as f64).sqrt() as usize,
            Self::Log2 => (n as f64).log2() as usize,
            Self::All => n,
            Self::Count(k) => k,
        };
        k.clamp(1, n)
    }
}

/// Training hyperparameters for the forest.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of trees.
    pub n_trees: usize,
    /// Seed for bootstrap and feature sampling.
    pub seed: u64,
    /// Maximum depth of each tree; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node.
    pub min_samples_split: usize,
    /// Minimum samples required on each side of a split.
    pub min_samples_leaf: usize,
    /// Candidate features per split.
    pub max_features: MaxFeatures,
    /// Draw a bootstrap sample per tree instead of using every row.
    pub bootstrap: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 0,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

/// In-memory dataset used for training.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Feature names in column order.
    pub feature_names: Vec<String>,
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    /// Feature matrix, one row per sample.
    pub x: Array2<f32>,
    /// Class indices aligned with the rows of `x`.
    pub y: Vec<usize>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrainError {
    #[error("Empty dataset")]
    EmptyDataset,
    #[error("Mismatched X/Y lengths: {rows} rows, {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("Feature matrix has {columns} columns but {names} feature names")]
    FeatureNameMismatch { columns: usize, names: usize },
    #[error("Need at least 1 class")]
    NoClasses,
    #[error("Row {row} has class index {label} but only {n_classes} classes exist")]
    LabelOutOfRange {
        row: usize,
        label: usize,
        n_classes: usize,
    },
    #[error("Need at least 1 tree")]
    NoTrees,
    #[error("Too many features: {0}")]
    TooManyFeatures(usize),
}

/// Train a random forest of CART trees with Gini impurity.
///
/// Each tree gets its own seed drawn in order from a generator seeded with
/// `options.seed`, so equal inputs and options always yield an equal model.
pub fn train_random_forest(
    dataset: &TrainDataset,
    options: &TrainOptions,
) -> Result<RandomForestModel, TrainError> {
    let (n, d) = dataset.x.dim();
    if n != dataset.y.len() {
        return Err(TrainError::LengthMismatch {
            rows: n,
            labels: dataset.y.len(),
        });
    }
    if d != dataset.feature_names.len() {
        return Err(TrainError::FeatureNameMismatch {
            columns: d,
            names: dataset.feature_names.len(),
        });
    }
    if d > usize::from(u16::MAX) {
        return Err(TrainError::TooManyFeatures(d));
    }
    if n == 0 {
        return Err(TrainError::EmptyDataset);
    }
    let n_classes = dataset.classes.len();
    if n_classes == 0 {
        return Err(TrainError::NoClasses);
    }
    if let Some((row, &label)) = dataset.y.iter().enumerate().find(|(_, l)| **l >= n_classes) {
        return Err(TrainError::LabelOutOfRange {
            row,
            label,
            n_classes,
        });
    }
    if options.n_trees == 0 {
        return Err(TrainError::NoTrees);
    }

    let max_features = options.max_features.resolve(d);
    let mut seeds = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_trees);
    for tree_idx in 0..options.n_trees {
        let mut rng = StdRng::seed_from_u64(seeds.random::<u64>());
        let samples: Vec<usize> = if options.bootstrap {
            (0..n).map(|_| rng.random_range(0..n)).collect()
        } else {
            (0..n).collect()
        };
        let builder = TreeBuilder {
            x: &dataset.x,
            y: &dataset.y,
            n_classes,
            max_features,
            options,
            rng,
            nodes: Vec::new(),
        };
        let tree = builder.grow(samples);
        tracing::debug!(
            tree = tree_idx,
            nodes = tree.nodes.len(),
            leaves = tree.leaf_count(),
            depth = tree.depth(),
            "Grew tree"
        );
        trees.push(tree);
    }

    Ok(RandomForestModel {
        model_version: MODEL_VERSION,
        feature_names: dataset.feature_names.clone(),
        classes: dataset.classes.clone(),
        trees,
    })
}

struct TreeBuilder<'a> {
    x: &'a Array2<f32>,
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    options: &'a TrainOptions,
    rng: StdRng,
    nodes: Vec<TreeNode>,
}

struct PendingNode {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    score: f64,
    feature_index: usize,
    threshold: f32,
}

impl TreeBuilder<'_> {
    fn grow(mut self, samples: Vec<usize>) -> DecisionTree {
        self.nodes.push(placeholder());
        let mut stack = vec![PendingNode {
            node: 0,
            samples,
            depth: 0,
        }];
        while let Some(pending) = stack.pop() {
            let counts = self.class_counts(&pending.samples);
            let Some(split) = self.find_split(&pending, &counts) else {
                self.nodes[pending.node] = leaf(&counts, pending.samples.len());
                continue;
            };
            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = pending
                .samples
                .iter()
                .copied()
                .partition(|&i| self.x[[i, split.feature_index]] <= split.threshold);
            let left = self.nodes.len();
            let right = left + 1;
            self.nodes.push(placeholder());
            self.nodes.push(placeholder());
            self.nodes[pending.node] = TreeNode::Split {
                feature_index: split.feature_index as u16,
                threshold: split.threshold,
                left: left as u32,
                right: right as u32,
            };
            stack.push(PendingNode {
                node: right,
                samples: right_samples,
                depth: pending.depth + 1,
            });
            stack.push(PendingNode {
                node: left,
                samples: left_samples,
                depth: pending.depth + 1,
            });
        }
        DecisionTree { nodes: self.nodes }
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn find_split(&mut self, pending: &PendingNode, counts: &[usize]) -> Option<Split> {
        let n = pending.samples.len();
        let min_leaf = self.options.min_samples_leaf.max(1);
        if n < self.options.min_samples_split.max(2) || n < 2 * min_leaf {
            return None;
        }
        if self
            .options
            .max_depth
            .is_some_and(|max_depth| pending.depth >= max_depth)
        {
            return None;
        }
        if counts.iter().filter(|&&c| c > 0).count() <= 1 {
            return None;
        }

        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);
        let mut best: Option<Split> = None;
        // Constant features do not count towards the candidate budget.
        for (visited, feature_index) in features.into_iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let candidate = self.best_split_for_feature(&pending.samples, feature_index, counts);
            if let Some(candidate) = candidate
                && best.is_none_or(|b| candidate.score < b.score)
            {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(
        &self,
        samples: &[usize],
        feature_index: usize,
        counts: &[usize],
    ) -> Option<Split> {
        let n = samples.len();
        let min_leaf = self.options.min_samples_leaf.max(1);
        let mut sorted: Vec<(f32, usize)> = samples
            .iter()
            .map(|&i| (self.x[[i, feature_index]], self.y[i]))
            .collect();
        // NaN of either sign sorts last so it stays right of every threshold.
        sorted.sort_by(|a, b| {
            a.0.is_nan()
                .cmp(&b.0.is_nan())
                .then_with(|| a.0.total_cmp(&b.0))
        });

        let mut left = vec![0usize; self.n_classes];
        let mut right = counts.to_vec();
        let mut best: Option<Split> = None;
        for pos in 0..n - 1 {
            let (value, label) = sorted[pos];
            left[label] += 1;
            right[label] -= 1;
            let next = sorted[pos + 1].0;
            if next.partial_cmp(&value) != Some(Ordering::Greater) {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let score = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / n as f64;
            if best.is_none_or(|b| score < b.score) {
                best = Some(Split {
                    score,
                    feature_index,
                    threshold: midpoint(value, next),
                });
            }
        }
        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Threshold separating `low` from `high`; rounding may not land on `high`.
fn midpoint(low: f32, high: f32) -> f32 {
    let mid = low + (high - low) / 2.0;
    if mid >= high || !mid.is_finite() {
        low
    } else {
        mid
    }
}

fn leaf(counts: &[usize], total: usize) -> TreeNode {
    let total = total.max(1) as f32;
    TreeNode::Leaf {
        distribution: counts.iter().map(|&c| c as f32 / total).collect(),
    }
}

fn placeholder() -> TreeNode {
    TreeNode::Leaf {
        distribution: Vec::new(),
    }
}
