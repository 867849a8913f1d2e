//! Machine learning helpers for training and inference.
//!
//! These utilities train the crop recommendation model and load/predict with it in Rust.

pub mod random_forest;
