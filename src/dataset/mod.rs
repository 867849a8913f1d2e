//! Tabular dataset loading for model training.

pub mod loader;

pub use loader::{DatasetError, TrainingTable, load_training_table, read_training_table};
