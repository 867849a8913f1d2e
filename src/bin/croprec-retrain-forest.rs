//! Retrain the crop recommendation random forest.
//!
//! Reads `Data-processed/crop_recommendation.csv`, fits a 300-tree forest, and
//! writes `app/models/RandomForest.bin`, both relative to the repository root.
//! Takes no arguments.

use croprec::config::TrainerConfig;
use croprec::logging;
use croprec::trainer::{retrain, saved_message};

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let path = retrain(&TrainerConfig::default()).map_err(|err| err.to_string())?;
    println!("{}", saved_message(&path));
    Ok(())
}
