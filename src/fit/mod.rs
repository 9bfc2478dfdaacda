//! Regularization-path fitting.
//!
//! Responsibilities:
//!
//! - solve one penalized problem per λ (`solver`)
//! - walk the λ path with warm starts and expose fitted models (`estimator`)
//! - choose λ by k-fold cross-validation (parallel over folds) (`cv`)

pub mod cv;
pub mod estimator;
pub mod solver;

pub use cv::*;
pub use estimator::*;
pub use solver::*;
