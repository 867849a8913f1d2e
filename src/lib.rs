//! Crop recommendation model training.
//!
//! Library exports shared by the retraining executable, benchmarks, and the
//! application code that loads the trained forest.

/// Fixed dataset/artifact locations and forest settings.
pub mod config;
/// CSV dataset loading.
pub mod dataset;
/// Tracing subscriber setup.
pub mod logging;
/// Random forest training and inference.
pub mod ml;
/// The read → fit → write retraining pipeline.
pub mod trainer;
