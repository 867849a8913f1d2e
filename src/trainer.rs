//! Retraining pipeline: read the CSV, fit the forest, write the artifact.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{FEATURE_COLUMNS, TARGET_COLUMN, TrainerConfig};
use crate::dataset::{DatasetError, load_training_table};
use crate::ml::random_forest::{ModelError, TrainError, train_random_forest};

/// Failure of any step of a retraining run.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error("Failed to create model directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Run one retraining pass and return the artifact path.
///
/// The dataset is loaded and the model fitted before anything touches the
/// filesystem, so a bad dataset leaves any existing artifact untouched.
pub fn retrain(config: &TrainerConfig) -> Result<PathBuf, TrainerError> {
    let table = load_training_table(&config.dataset_path, &FEATURE_COLUMNS, TARGET_COLUMN)?;
    tracing::info!(
        "Loaded {} rows from {}",
        table.len(),
        config.dataset_path.display()
    );
    let dataset = table.into_train_dataset();
    tracing::info!(
        classes = dataset.classes.len(),
        trees = config.forest.n_trees,
        seed = config.forest.seed,
        "Training random forest"
    );
    let model = train_random_forest(&dataset, &config.forest)?;
    tracing::info!("Trained {} trees", model.trees.len());

    ensure_parent_dir(&config.model_path)?;
    let bytes = model.save(&config.model_path)?;
    tracing::info!(
        "Wrote {bytes} bytes to {}",
        config.model_path.display()
    );
    Ok(config.model_path.clone())
}

/// Console line reported after a successful run.
pub fn saved_message(path: &Path) -> String {
    format!("Saved model to {}", path.display())
}

fn ensure_parent_dir(path: &Path) -> Result<(), TrainerError> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(parent).map_err(|source| TrainerError::CreateDir {
        path: parent.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn saved_message_names_the_artifact_path() {
        let path = Path::new("/srv/croprec/app/models/RandomForest.bin");
        assert_eq!(
            saved_message(path),
            "Saved model to /srv/croprec/app/models/RandomForest.bin"
        );
    }

    #[test]
    fn ensure_parent_dir_creates_nested_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/c/model.bin");
        ensure_parent_dir(&path).unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn ensure_parent_dir_accepts_bare_file_name() {
        ensure_parent_dir(Path::new("model.bin")).unwrap();
    }

    #[test]
    fn ensure_parent_dir_reports_blocked_path() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("app");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let err = ensure_parent_dir(&blocker.join("models/model.bin")).unwrap_err();
        assert!(matches!(err, TrainerError::CreateDir { .. }));
    }
}
