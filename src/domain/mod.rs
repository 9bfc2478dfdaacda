//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - estimator enums (`Family`, `Solver`, `ScoreMetric`)
//! - run configurations for each CLI command (`DemoConfig`, `FitConfig`, `PredictConfig`)

pub mod types;

pub use types::*;
