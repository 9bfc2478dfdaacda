//! Column standardization (zero mean, unit population variance).

use nalgebra::{DMatrix, DVector};

use crate::error::GlmError;

/// Per-column location and scale learned from a training matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    pub mean: DVector<f64>,
    /// Population standard deviation; constant columns store 1.0.
    pub scale: DVector<f64>,
}

impl Standardizer {
    pub fn fit(x: &DMatrix<f64>) -> Result<Self, GlmError> {
        if x.nrows() == 0 {
            return Err(GlmError::InvalidParameter("cannot standardize an empty matrix".into()));
        }
        let n = x.nrows() as f64;
        let mut mean = DVector::zeros(x.ncols());
        let mut scale = DVector::zeros(x.ncols());
        for (j, col) in x.column_iter().enumerate() {
            let m = col.sum() / n;
            let var = col.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n;
            let sd = var.sqrt();
            mean[j] = m;
            scale[j] = if sd > 0.0 && sd.is_finite() { sd } else { 1.0 };
        }
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, GlmError> {
        if x.ncols() != self.mean.len() {
            return Err(GlmError::shape("standardizer columns", self.mean.len(), x.ncols()));
        }
        Ok(DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            (x[(i, j)] - self.mean[j]) / self.scale[j]
        }))
    }

    pub fn fit_transform(x: &DMatrix<f64>) -> Result<(Self, DMatrix<f64>), GlmError> {
        let scaler = Self::fit(x)?;
        let scaled = scaler.transform(x)?;
        Ok((scaler, scaled))
    }
}
