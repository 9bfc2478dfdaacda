//! GLM likelihoods and the penalized objective.
//!
//! Everything here is a pure function of `(family, eta, X, y, β₀, β)` so the
//! solvers and metrics can share it.

pub mod likelihood;

pub use likelihood::*;
