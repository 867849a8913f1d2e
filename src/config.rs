//! Fixed locations and hyperparameters for the retraining job.
//!
//! The job has no runtime configuration surface. Paths are anchored at the
//! repository root and the forest settings are constants, so every run of the
//! executable reads and writes the same files with the same model settings.

use std::path::{Path, PathBuf};

use crate::ml::random_forest::TrainOptions;

/// Dataset location relative to the repository root.
pub const DATASET_RELATIVE_PATH: &str = "Data-processed/crop_recommendation.csv";
/// Model artifact location relative to the repository root.
pub const MODEL_RELATIVE_PATH: &str = "app/models/RandomForest.bin";

/// Feature columns in the order consumed at inference time.
pub const FEATURE_COLUMNS: [&str; 7] = ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];
/// Column holding the recommended crop.
pub const TARGET_COLUMN: &str = "label";

/// Number of trees in the forest.
pub const N_ESTIMATORS: usize = 300;
/// Seed for bootstrap sampling and feature subsampling.
pub const RANDOM_SEED: u64 = 42;

/// Resolved inputs for a single retraining run.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// CSV dataset read by the trainer.
    pub dataset_path: PathBuf,
    /// Artifact written by the trainer.
    pub model_path: PathBuf,
    /// Forest hyperparameters.
    pub forest: TrainOptions,
}

impl TrainerConfig {
    /// Anchor the dataset and artifact paths at `root`.
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            dataset_path: root.join(DATASET_RELATIVE_PATH),
            model_path: root.join(MODEL_RELATIVE_PATH),
            forest: forest_options(),
        }
    }
}

impl Default for TrainerConfig {
    /// Paths anchored at the repository root.
    fn default() -> Self {
        Self::for_root(repo_root())
    }
}

/// Root of the repository this crate was built from.
pub fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn forest_options() -> TrainOptions {
    TrainOptions {
        n_trees: N_ESTIMATORS,
        seed: RANDOM_SEED,
        ..TrainOptions::default()
    }
}
