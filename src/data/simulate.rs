//! Synthetic design matrices, sparse coefficients and simulated targets.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::distributions::Bernoulli;
use rand::seq::index::sample as sample_indices;
use rand_distr::{Distribution, Normal, Poisson};

use crate::domain::Family;
use crate::error::GlmError;
use crate::models::{linear_predictor, mean_response};

fn standard_normal() -> Result<Normal<f64>, GlmError> {
    Normal::new(0.0, 1.0).map_err(|e| GlmError::InvalidParameter(format!("noise distribution: {e}")))
}

/// Draw targets for `family` from the true model `(beta0, beta)` on design `x`.
///
/// - gaussian: `μ + N(0, 1)`
/// - binomial: `Bernoulli(μ)`
/// - poisson / softplus: `Poisson(μ)`; a non-positive mean yields 0
pub fn simulate<R: Rng + ?Sized>(
    family: Family,
    eta: f64,
    beta0: f64,
    beta: &DVector<f64>,
    x: &DMatrix<f64>,
    rng: &mut R,
) -> Result<DVector<f64>, GlmError> {
    let z = linear_predictor(x, beta0, beta)?;
    let mu = mean_response(family, eta, &z);
    if let Some(bad) = mu.iter().find(|m| !m.is_finite()) {
        return Err(GlmError::InvalidParameter(format!(
            "true coefficients produce a non-finite mean ({bad})"
        )));
    }

    let mut y = DVector::zeros(mu.len());
    match family {
        Family::Gaussian => {
            let normal = standard_normal()?;
            for (yi, &mi) in y.iter_mut().zip(mu.iter()) {
                *yi = mi + normal.sample(rng);
            }
        }
        Family::Binomial => {
            for (yi, &mi) in y.iter_mut().zip(mu.iter()) {
                let coin = Bernoulli::new(mi.clamp(0.0, 1.0))
                    .map_err(|e| GlmError::InvalidParameter(format!("bernoulli mean {mi}: {e}")))?;
                *yi = if coin.sample(rng) { 1.0 } else { 0.0 };
            }
        }
        Family::Poisson | Family::Softplus => {
            for (yi, &mi) in y.iter_mut().zip(mu.iter()) {
                if mi <= 0.0 {
                    continue;
                }
                let poisson = Poisson::new(mi)
                    .map_err(|e| GlmError::InvalidParameter(format!("poisson mean {mi}: {e}")))?;
                *yi = poisson.sample(rng);
            }
        }
    }
    Ok(y)
}

/// `n_samples × n_features` matrix of independent `N(0, 1)` draws.
pub fn gaussian_design<R: Rng + ?Sized>(
    n_samples: usize,
    n_features: usize,
    rng: &mut R,
) -> Result<DMatrix<f64>, GlmError> {
    if n_samples == 0 || n_features == 0 {
        return Err(GlmError::InvalidParameter(format!(
            "design must be non-empty, got {n_samples}x{n_features}"
        )));
    }
    let normal = standard_normal()?;
    // Row-major fill keeps the draw order independent of nalgebra's storage layout.
    let data: Vec<f64> = (0..n_samples * n_features).map(|_| normal.sample(rng)).collect();
    Ok(DMatrix::from_row_slice(n_samples, n_features, &data))
}

/// Sparse coefficient vector: `round(density · n_features)` positions drawn without
/// replacement get `U[0, 1)` values, the rest are zero.
pub fn sparse_coefficients<R: Rng + ?Sized>(
    n_features: usize,
    density: f64,
    rng: &mut R,
) -> Result<DVector<f64>, GlmError> {
    if !(density.is_finite() && (0.0..=1.0).contains(&density)) {
        return Err(GlmError::InvalidParameter(format!(
            "density must be in [0, 1], got {density}"
        )));
    }
    let k = ((density * n_features as f64).round() as usize).min(n_features);
    let mut beta = DVector::zeros(n_features);
    for idx in sample_indices(rng, n_features, k) {
        beta[idx] = rng.r#gen::<f64>();
    }
    Ok(beta)
}

/// Scalar intercept `N(0, 1)`.
pub fn gaussian_intercept<R: Rng + ?Sized>(rng: &mut R) -> Result<f64, GlmError> {
    Ok(standard_normal()?.sample(rng))
}
