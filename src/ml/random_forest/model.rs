use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current artifact layout of [`RandomForestModel`].
pub const MODEL_VERSION: i64 = 1;

/// Errors raised while persisting or loading a forest.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Reading or writing the artifact failed.
    #[error("Failed to access model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The artifact could not be encoded or decoded.
    #[error("model codec error: {0}")]
    Codec(#[from] bincode::Error),
    /// The decoded model violates a structural invariant.
    #[error("invalid model: {0}")]
    Invalid(String),
}

/// Node stored in a tree's flat arena. The root is node `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Routes `features[feature_index] <= threshold` to `left`, everything else to `right`.
    Split {
        feature_index: u16,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Normalized class distribution of the training samples that reached this leaf.
    Leaf { distribution: Vec<f32> },
}

/// Single CART tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Children always sit at higher indices than their parent.
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Class distribution of the leaf reached by `features`.
    ///
    /// Missing feature values read as `0.0`. A malformed tree yields an empty slice.
    pub fn leaf_distribution(&self, features: &[f32]) -> &[f32] {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { distribution }) => return distribution,
                Some(TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features
                        .get(*feature_index as usize)
                        .copied()
                        .unwrap_or(0.0);
                    let next = (if value <= *threshold { *left } else { *right }) as usize;
                    if next <= idx {
                        return &[];
                    }
                    idx = next;
                }
                None => return &[],
            }
        }
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, TreeNode::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max_depth = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = node {
                let child_depth = depths[idx] + 1;
                for child in [*left as usize, *right as usize] {
                    if let Some(slot) = depths.get_mut(child) {
                        *slot = child_depth;
                        max_depth = max_depth.max(*slot);
                    }
                }
            }
        }
        max_depth
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature_index,
                    left,
                    right,
                    ..
                } => {
                    if *feature_index as usize >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature_index} but model has {n_features}"
                        ));
                    }
                    for child in [*left as usize, *right as usize] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has out-of-order child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!(
                            "leaf {idx} has {} class weights but expected {n_classes}",
                            distribution.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Random forest classifier trained on fixed-order feature vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    /// Model format version.
    pub model_version: i64,
    /// Feature names in the order callers must supply values.
    pub feature_names: Vec<String>,
    /// Ordered list of class labels.
    pub classes: Vec<String>,
    /// Ensemble members; predictions average their leaf distributions.
    pub trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.classes.is_empty() {
            return Err(ModelError::Invalid("model has no classes".to_string()));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("model has no trees".to_string()));
        }
        if self.feature_names.len() > usize::from(u16::MAX) {
            return Err(ModelError::Invalid(format!(
                "model has {} features; at most {} are supported",
                self.feature_names.len(),
                u16::MAX
            )));
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len(), self.classes.len())
                .map_err(|reason| ModelError::Invalid(format!("tree {tree_idx}: {reason}")))?;
        }
        Ok(())
    }

    /// Number of values expected per feature vector.
    pub fn feature_len(&self) -> usize {
        self.feature_names.len()
    }

    /// Predict class probabilities for a feature vector.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let n_classes = self.classes.len();
        let mut proba = vec![0.0f32; n_classes];
        if self.trees.is_empty() {
            return proba;
        }
        for tree in &self.trees {
            let distribution = tree.leaf_distribution(features);
            if distribution.len() != n_classes {
                continue;
            }
            for (acc, &p) in proba.iter_mut().zip(distribution) {
                *acc += p;
            }
        }
        let scale = 1.0 / self.trees.len() as f32;
        for p in &mut proba {
            *p *= scale;
        }
        proba
    }

    /// Predict the best class index for a feature vector.
    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }

    /// Predict the class label for a feature vector.
    ///
    /// Returns `None` only for a model without classes.
    pub fn predict(&self, features: &[f32]) -> Option<&str> {
        self.classes
            .get(self.predict_class_index(features))
            .map(String::as_str)
    }

    /// Write the model to `path` as bincode, replacing any existing file.
    ///
    /// Returns the number of bytes written.
    pub fn save(&self, path: &Path) -> Result<u64, ModelError> {
        let bytes = bincode::serialize(self)?;
        std::fs::write(path, &bytes).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(bytes.len() as u64)
    }

    /// Load and validate a model written by [`RandomForestModel::save`].
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = bincode::deserialize(&bytes)?;
        model.validate()?;
        Ok(model)
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}
