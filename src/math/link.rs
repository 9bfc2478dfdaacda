//! Stable inverse link functions.
//!
//! The Poisson canonical link is `μ = exp(z)`. Left alone it overflows for large
//! linear predictors, so above a threshold `eta` we continue it with its tangent:
//!
//! ```text
//! μ(z) = exp(z)                             z <= eta
//! μ(z) = exp(eta)·z + (1 - eta)·exp(eta)    z >  eta
//! ```
//!
//! Both the value and the first derivative match at `z = eta`.
//!
//! Numerical notes:
//! - The logistic function is evaluated on the branch that never exponentiates a
//!   positive number.
//! - Softplus uses `max(z, 0) + ln1p(exp(-|z|))`.

use crate::domain::Family;

/// `exp(z)` below `eta`, its tangent line at `eta` above.
pub fn linearized_exp(z: f64, eta: f64) -> f64 {
    if z <= eta {
        z.exp()
    } else {
        let slope = eta.exp();
        z * slope + (1.0 - eta) * slope
    }
}

/// Derivative of [`linearized_exp`] with respect to `z`.
pub fn linearized_exp_grad(z: f64, eta: f64) -> f64 {
    if z <= eta { z.exp() } else { eta.exp() }
}

/// Logistic sigmoid.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + exp(z))` without overflow.
pub fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

/// Map a linear predictor to the mean response for `family`.
pub fn inverse_link(family: Family, z: f64, eta: f64) -> f64 {
    match family {
        Family::Gaussian => z,
        Family::Binomial => sigmoid(z),
        Family::Poisson => linearized_exp(z, eta),
        Family::Softplus => softplus(z),
    }
}

/// `dμ/dz` for `family`.
pub fn inverse_link_grad(family: Family, z: f64, eta: f64) -> f64 {
    match family {
        Family::Gaussian => 1.0,
        Family::Binomial => {
            let s = sigmoid(z);
            s * (1.0 - s)
        }
        Family::Poisson => linearized_exp_grad(z, eta),
        Family::Softplus => sigmoid(z),
    }
}

/// One row of the linearized-vs-exact comparison table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkPoint {
    pub z: f64,
    pub linearized: f64,
    pub exact: f64,
}

/// Evaluate both curves on `steps` evenly spaced points of `[z_min, z_max]`.
pub fn link_curve(eta: f64, z_min: f64, z_max: f64, steps: usize) -> Vec<LinkPoint> {
    let steps = steps.max(2);
    (0..steps)
        .map(|i| {
            let u = i as f64 / (steps as f64 - 1.0);
            let z = z_min + u * (z_max - z_min);
            LinkPoint {
                z,
                linearized: linearized_exp(z, eta),
                exact: z.exp(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn matches_exp_at_or_below_eta() {
        let eta = 4.0;
        for &z in &[-5.0, -0.5, 0.0, 1.0, 3.999, 4.0] {
            assert_abs_diff_eq!(linearized_exp(z, eta), f64::exp(z), epsilon = 1e-12);
        }
    }

    #[test]
    fn follows_tangent_above_eta() {
        let eta: f64 = 4.0;
        let slope = eta.exp();
        for &z in &[4.001, 5.0, 10.0, 100.0] {
            let expected = z * slope + (1.0 - eta) * slope;
            assert_abs_diff_eq!(linearized_exp(z, eta), expected, epsilon = 1e-9);
        }
        // Far above eta the tangent stays far below exp.
        assert!(linearized_exp(10.0, eta) < f64::exp(10.0));
    }

    #[test]
    fn continuous_with_matching_slope_at_eta() {
        let eta = 2.0;
        let h = 1e-7;
        let below = linearized_exp(eta - h, eta);
        let above = linearized_exp(eta + h, eta);
        assert_abs_diff_eq!(below, above, epsilon = 1e-5);
        assert_abs_diff_eq!(
            linearized_exp_grad(eta, eta),
            linearized_exp_grad(eta + h, eta),
            epsilon = 1e-12
        );
    }

    #[test]
    fn link_gradients_match_finite_differences() {
        let h = 1e-6;
        for family in [Family::Gaussian, Family::Binomial, Family::Poisson, Family::Softplus] {
            for &z in &[-2.0, 0.3, 1.5, 6.0] {
                let numeric =
                    (inverse_link(family, z + h, 4.0) - inverse_link(family, z - h, 4.0)) / (2.0 * h);
                assert_abs_diff_eq!(inverse_link_grad(family, z, 4.0), numeric, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn stable_links_stay_finite() {
        for &z in &[-800.0, -30.0, 0.0, 30.0, 800.0] {
            let s = sigmoid(z);
            assert!(s.is_finite() && (0.0..=1.0).contains(&s));
            assert!(softplus(z).is_finite());
            assert!(inverse_link(Family::Poisson, z, 4.0).is_finite());
        }
        assert_abs_diff_eq!(softplus(0.0), 2f64.ln(), epsilon = 1e-15);
        assert_abs_diff_eq!(softplus(800.0), 800.0, epsilon = 1e-9);
    }

    #[test]
    fn curve_covers_requested_range() {
        let curve = link_curve(4.0, 0.0, 10.0, 100);
        assert_eq!(curve.len(), 100);
        assert_abs_diff_eq!(curve[0].z, 0.0);
        assert_abs_diff_eq!(curve[99].z, 10.0, epsilon = 1e-12);
        for p in &curve {
            if p.z <= 4.0 {
                assert_abs_diff_eq!(p.linearized, p.exact, epsilon = 1e-9);
            } else {
                assert!(p.linearized < p.exact);
            }
        }
    }
}
