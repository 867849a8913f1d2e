//! Deterministic random-forest classifier.
//!
//! Trees are grown with CART on Gini impurity over bootstrap samples, with a
//! random subset of candidate features per split. Supports:
//! - Multi-class classification by averaging leaf class distributions.
//! - Reproducible training from a single seed.
//! - Binary (bincode) model export/load for downstream inference.

mod model;
mod train;

pub use model::{DecisionTree, MODEL_VERSION, ModelError, RandomForestModel, TreeNode};
pub use train::{MaxFeatures, TrainDataset, TrainError, TrainOptions, train_random_forest};
