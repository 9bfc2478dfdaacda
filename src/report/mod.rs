//! Reporting utilities: per-λ path summaries and formatted terminal output.

use nalgebra::{DMatrix, DVector};

use crate::error::GlmError;
use crate::fit::GlmPath;

pub mod format;

pub use format::*;

/// One line of the path summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRow {
    pub reg_lambda: f64,
    pub n_iter: usize,
    pub converged: bool,
    pub n_nonzero: usize,
    pub score: f64,
}

/// Score each model of `path` on `(x, y)` and collect its fit bookkeeping.
pub fn summarize_path(
    path: &GlmPath,
    x: &DMatrix<f64>,
    y: &DVector<f64>,
) -> Result<Vec<PathRow>, GlmError> {
    path.iter()
        .map(|m| {
            Ok(PathRow {
                reg_lambda: m.reg_lambda,
                n_iter: m.n_iter,
                converged: m.converged,
                n_nonzero: m.n_nonzero(),
                score: m.score(x, y)?,
            })
        })
        .collect()
}
