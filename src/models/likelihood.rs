//! Log-likelihoods and the penalized objective.
//!
//! The objective minimized at each point of the regularization path is
//!
//! ```text
//! J(β₀, β) = -(1/n) Σ ℓ(y_i, μ_i) + λ (½(1-α)‖β‖² + α‖β‖₁)
//! μ_i      = inverse_link(β₀ + x_iᵀβ)
//! ```
//!
//! Constant terms (`ln y!`, Gaussian normalizers) are dropped; they cancel in every
//! metric we report. The intercept is never penalized.
//!
//! The solvers only need two primitives per sample, both with respect to the
//! linear predictor `z`: the first derivative of the per-sample negative
//! log-likelihood and its curvature. Those are implemented here for each family.

use nalgebra::{DMatrix, DVector};

use crate::domain::Family;
use crate::error::GlmError;
use crate::math::{inverse_link, sigmoid, softplus};

/// Floor for count-model means inside logarithms.
const MU_FLOOR: f64 = 1e-300;

/// Probability clip for the Bernoulli log-likelihood.
const PROB_EPS: f64 = 1e-12;

/// Below this `z`, `sigmoid(z) / softplus(z)` equals 1 to double precision.
const SOFTPLUS_RATIO_CUTOFF: f64 = -30.0;

/// `z = β₀ + Xβ`.
pub fn linear_predictor(
    x: &DMatrix<f64>,
    beta0: f64,
    beta: &DVector<f64>,
) -> Result<DVector<f64>, GlmError> {
    if x.ncols() != beta.len() {
        return Err(GlmError::shape("coefficients", x.ncols(), beta.len()));
    }
    let mut z = x * beta;
    z.add_scalar_mut(beta0);
    Ok(z)
}

/// Elementwise inverse link.
pub fn mean_response(family: Family, eta: f64, z: &DVector<f64>) -> DVector<f64> {
    z.map(|zi| inverse_link(family, zi, eta))
}

/// Summed log-likelihood of `y` under means `mu`.
pub fn log_likelihood(family: Family, y: &DVector<f64>, mu: &DVector<f64>) -> f64 {
    y.iter()
        .zip(mu.iter())
        .map(|(&yi, &mi)| match family {
            Family::Gaussian => -0.5 * (yi - mi) * (yi - mi),
            Family::Binomial => {
                let p = mi.clamp(PROB_EPS, 1.0 - PROB_EPS);
                yi * p.ln() + (1.0 - yi) * (1.0 - p).ln()
            }
            Family::Poisson | Family::Softplus => yi * mi.max(MU_FLOOR).ln() - mi,
        })
        .sum()
}

/// Log-likelihood of the saturated model (`μ = y`).
///
/// Only count families have a non-zero saturated term once constants are dropped.
pub fn saturated_log_likelihood(family: Family, y: &DVector<f64>) -> f64 {
    if !family.is_count() {
        return 0.0;
    }
    y.iter()
        .filter(|&&yi| yi > 0.0)
        .map(|&yi| yi * yi.ln() - yi)
        .sum()
}

/// Elastic-net penalty on the slope coefficients.
pub fn penalty(alpha: f64, reg_lambda: f64, beta: &DVector<f64>) -> f64 {
    let l2 = beta.norm_squared();
    let l1: f64 = beta.iter().map(|b| b.abs()).sum();
    reg_lambda * (0.5 * (1.0 - alpha) * l2 + alpha * l1)
}

/// Negative log-likelihood of one sample, evaluated from the linear predictor.
fn sample_nll(family: Family, eta: f64, z: f64, y: f64) -> f64 {
    match family {
        Family::Gaussian => 0.5 * (y - z) * (y - z),
        Family::Binomial => softplus(z) - y * z,
        Family::Poisson | Family::Softplus => {
            let mu = inverse_link(family, z, eta);
            mu - y * mu.max(MU_FLOOR).ln()
        }
    }
}

/// `sigmoid(z) / softplus(z)`, i.e. `μ'(z)/μ(z)` for the softplus link.
fn softplus_ratio(z: f64) -> f64 {
    if z < SOFTPLUS_RATIO_CUTOFF {
        1.0
    } else {
        sigmoid(z) / softplus(z)
    }
}

/// First and second derivative of the per-sample negative log-likelihood in `z`.
fn sample_derivatives(family: Family, eta: f64, z: f64, y: f64) -> (f64, f64) {
    match family {
        Family::Gaussian => (z - y, 1.0),
        Family::Binomial => {
            let mu = sigmoid(z);
            (mu - y, mu * (1.0 - mu))
        }
        Family::Poisson => {
            if z <= eta {
                let mu = z.exp();
                (mu - y, mu)
            } else {
                // Linear branch: μ = e^η (z + 1 - η), μ' = e^η.
                let slope = eta.exp();
                let mu = slope * (z + 1.0 - eta);
                let q = y / mu;
                (slope * (1.0 - q), q * slope * slope / mu)
            }
        }
        Family::Softplus => {
            let s = sigmoid(z);
            let r = softplus_ratio(z);
            let g = s - y * r;
            let h = s * (1.0 - s) - y * (1.0 - s) * r + y * r * r;
            (g, h)
        }
    }
}

/// The penalized objective for one value of `reg_lambda`.
#[derive(Debug, Clone, Copy)]
pub struct Objective<'a> {
    pub family: Family,
    pub eta: f64,
    pub alpha: f64,
    pub reg_lambda: f64,
    pub x: &'a DMatrix<f64>,
    pub y: &'a DVector<f64>,
}

impl<'a> Objective<'a> {
    pub fn n_samples(&self) -> usize {
        self.y.len()
    }

    /// Penalized loss given a precomputed linear predictor.
    pub fn loss_at(&self, z: &DVector<f64>, beta: &DVector<f64>) -> f64 {
        let n = self.n_samples().max(1) as f64;
        let nll: f64 = z
            .iter()
            .zip(self.y.iter())
            .map(|(&zi, &yi)| sample_nll(self.family, self.eta, zi, yi))
            .sum();
        nll / n + penalty(self.alpha, self.reg_lambda, beta)
    }

    /// Penalized loss at `(beta0, beta)`.
    pub fn loss(&self, beta0: f64, beta: &DVector<f64>) -> Result<f64, GlmError> {
        let z = linear_predictor(self.x, beta0, beta)?;
        Ok(self.loss_at(&z, beta))
    }

    /// Per-sample first and second derivatives with respect to `z`.
    pub fn sample_terms(&self, z: &DVector<f64>) -> (DVector<f64>, DVector<f64>) {
        let n = z.len();
        let mut g = DVector::zeros(n);
        let mut h = DVector::zeros(n);
        for i in 0..n {
            let (gi, hi) = sample_derivatives(self.family, self.eta, z[i], self.y[i]);
            g[i] = gi;
            h[i] = hi;
        }
        (g, h)
    }

    /// Curvature of the smooth loss along slope `k`, given per-sample curvatures `h`.
    pub fn coordinate_hessian(&self, h: &DVector<f64>, k: usize) -> f64 {
        let n = self.n_samples().max(1) as f64;
        let weighted: f64 = self
            .x
            .column(k)
            .iter()
            .zip(h.iter())
            .map(|(&xi, &hi)| xi * xi * hi)
            .sum();
        weighted / n + self.reg_lambda * (1.0 - self.alpha)
    }

    /// Gradient of the smooth part of the loss (everything except the L1 term).
    pub fn gradient(&self, z: &DVector<f64>, beta: &DVector<f64>) -> (f64, DVector<f64>) {
        let n = self.n_samples().max(1) as f64;
        let (g, _) = self.sample_terms(z);
        let grad_beta0 = g.sum() / n;
        let mut grad_beta = self.x.tr_mul(&g) / n;
        grad_beta.axpy(self.reg_lambda * (1.0 - self.alpha), beta, 1.0);
        (grad_beta0, grad_beta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn toy() -> (DMatrix<f64>, DVector<f64>) {
        let x = DMatrix::from_row_slice(4, 2, &[0.5, -1.0, 1.5, 0.2, -0.3, 0.7, 1.0, 1.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 0.0, 2.0]);
        (x, y)
    }

    fn numeric_grad(obj: &Objective, beta0: f64, beta: &DVector<f64>) -> (f64, DVector<f64>) {
        // Central differences on the smooth part (alpha = 0 in callers).
        let h = 1e-6;
        let g0 = (obj.loss(beta0 + h, beta).unwrap() - obj.loss(beta0 - h, beta).unwrap()) / (2.0 * h);
        let mut g = DVector::zeros(beta.len());
        for j in 0..beta.len() {
            let mut up = beta.clone();
            let mut dn = beta.clone();
            up[j] += h;
            dn[j] -= h;
            g[j] = (obj.loss(beta0, &up).unwrap() - obj.loss(beta0, &dn).unwrap()) / (2.0 * h);
        }
        (g0, g)
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        let (x, y) = toy();
        let beta = DVector::from_vec(vec![0.8, -0.4]);
        for family in [Family::Gaussian, Family::Poisson, Family::Softplus] {
            // eta = 0.5 puts some samples on the linearized branch.
            let obj = Objective {
                family,
                eta: 0.5,
                alpha: 0.0,
                reg_lambda: 0.1,
                x: &x,
                y: &y,
            };
            let z = linear_predictor(&x, 0.3, &beta).unwrap();
            let (g0, g) = obj.gradient(&z, &beta);
            let (n0, n) = numeric_grad(&obj, 0.3, &beta);
            assert_abs_diff_eq!(g0, n0, epsilon = 1e-5);
            assert_abs_diff_eq!(g[0], n[0], epsilon = 1e-5);
            assert_abs_diff_eq!(g[1], n[1], epsilon = 1e-5);
        }
    }

    #[test]
    fn binomial_gradient_matches_finite_differences() {
        let (x, _) = toy();
        let y = DVector::from_vec(vec![1.0, 1.0, 0.0, 0.0]);
        let beta = DVector::from_vec(vec![0.2, 0.1]);
        let obj = Objective {
            family: Family::Binomial,
            eta: 2.0,
            alpha: 0.0,
            reg_lambda: 0.0,
            x: &x,
            y: &y,
        };
        let z = linear_predictor(&x, -0.1, &beta).unwrap();
        let (g0, g) = obj.gradient(&z, &beta);
        let (n0, n) = numeric_grad(&obj, -0.1, &beta);
        assert_abs_diff_eq!(g0, n0, epsilon = 1e-6);
        assert_abs_diff_eq!(g[0], n[0], epsilon = 1e-6);
        assert_abs_diff_eq!(g[1], n[1], epsilon = 1e-6);
    }

    #[test]
    fn poisson_curvature_matches_finite_differences_on_both_branches() {
        let eta = 1.0;
        for &(z, y) in &[(0.2, 2.0), (2.5, 4.0)] {
            let h = 1e-5;
            let (g_up, _) = sample_derivatives(Family::Poisson, eta, z + h, y);
            let (g_dn, _) = sample_derivatives(Family::Poisson, eta, z - h, y);
            let (_, hess) = sample_derivatives(Family::Poisson, eta, z, y);
            assert_abs_diff_eq!(hess, (g_up - g_dn) / (2.0 * h), epsilon = 1e-4);
        }
    }

    #[test]
    fn gaussian_coordinate_hessian_is_mean_square_plus_ridge() {
        let (x, y) = toy();
        let obj = Objective {
            family: Family::Gaussian,
            eta: 2.0,
            alpha: 0.5,
            reg_lambda: 0.2,
            x: &x,
            y: &y,
        };
        let z = linear_predictor(&x, 0.0, &DVector::zeros(2)).unwrap();
        let (_, h) = obj.sample_terms(&z);
        let expected = (0.25 + 2.25 + 0.09 + 1.0) / 4.0 + 0.1;
        assert_abs_diff_eq!(obj.coordinate_hessian(&h, 0), expected, epsilon = 1e-12);
    }

    #[test]
    fn saturated_likelihood_dominates_any_fit() {
        let y = DVector::from_vec(vec![0.0, 1.0, 4.0, 2.0]);
        let mu = DVector::from_vec(vec![0.5, 1.2, 3.0, 2.0]);
        let ls = saturated_log_likelihood(Family::Poisson, &y);
        let l1 = log_likelihood(Family::Poisson, &y, &mu);
        assert!(ls >= l1);
        assert_eq!(saturated_log_likelihood(Family::Gaussian, &y), 0.0);
    }

    #[test]
    fn penalty_mixes_l1_and_l2() {
        let beta = DVector::from_vec(vec![1.0, -2.0]);
        assert_abs_diff_eq!(penalty(1.0, 0.5, &beta), 1.5);
        assert_abs_diff_eq!(penalty(0.0, 0.5, &beta), 1.25);
    }

    #[test]
    fn linear_predictor_checks_shape() {
        let (x, _) = toy();
        let beta = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            linear_predictor(&x, 0.0, &beta),
            Err(GlmError::ShapeMismatch { expected: 2, found: 3, .. })
        ));
    }
}
