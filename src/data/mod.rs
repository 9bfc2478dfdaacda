//! Synthetic data generation and preprocessing.
//!
//! - design matrices, sparse true coefficients and simulated targets (`simulate`)
//! - column standardization (`scale`)

pub mod scale;
pub mod simulate;

pub use scale::*;
pub use simulate::*;
