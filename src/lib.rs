//! `glm-path` library crate.
//!
//! Elastic-net regularized generalized linear models fitted along a regularization
//! path, with a Poisson link that is linearized above a threshold `eta`.
//!
//! The binary (`glm`) is a thin wrapper around this library so that:
//!
//! - the estimator is usable and testable without spawning processes
//! - the CLI, file formats and reports stay out of the numerical code

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod metrics;
pub mod models;
pub mod report;
