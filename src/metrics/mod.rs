//! Goodness-of-fit metrics.
//!
//! - deviance: `-2 (L₁ - L_S)`
//! - pseudo-R²: likelihood-ratio R² against the constant `ynull` model
//! - accuracy: classification hit rate (binomial only)
//!
//! `L₁` is the log-likelihood of the fitted means, `L₀` of the null model and
//! `L_S` of the saturated model.

use nalgebra::DVector;

use crate::domain::{Family, ScoreMetric};
use crate::error::GlmError;
use crate::models::{log_likelihood, saturated_log_likelihood};

fn check_lengths(y: &DVector<f64>, mu: &DVector<f64>) -> Result<(), GlmError> {
    if y.len() != mu.len() {
        return Err(GlmError::shape("predictions", y.len(), mu.len()));
    }
    if y.is_empty() {
        return Err(GlmError::InvalidTarget("cannot score an empty target vector".into()));
    }
    Ok(())
}

/// Model deviance.
pub fn deviance(family: Family, y: &DVector<f64>, mu: &DVector<f64>) -> Result<f64, GlmError> {
    check_lengths(y, mu)?;
    let l1 = log_likelihood(family, y, mu);
    let ls = saturated_log_likelihood(family, y);
    Ok(-2.0 * (l1 - ls))
}

/// Pseudo-R² of `mu` relative to the constant prediction `ynull`.
///
/// Count families use the deviance ratio `1 - (L_S - L₁)/(L_S - L₀)`; the others
/// use McFadden's `1 - L₁/L₀`. The result never exceeds 1 and is negative when the
/// model does worse than the null prediction.
pub fn pseudo_r2(
    family: Family,
    y: &DVector<f64>,
    mu: &DVector<f64>,
    ynull: f64,
) -> Result<f64, GlmError> {
    check_lengths(y, mu)?;
    let null = DVector::from_element(y.len(), ynull);
    let l0 = log_likelihood(family, y, &null);
    let l1 = log_likelihood(family, y, mu);

    if family.is_count() {
        let ls = saturated_log_likelihood(family, y);
        let denom = ls - l0;
        if denom.abs() < f64::EPSILON {
            return Err(GlmError::InvalidTarget(
                "pseudo-R2 is undefined: null model already saturates the targets".into(),
            ));
        }
        Ok(1.0 - (ls - l1) / denom)
    } else {
        if l0.abs() < f64::EPSILON {
            return Err(GlmError::InvalidTarget(
                "pseudo-R2 is undefined: null model log-likelihood is zero".into(),
            ));
        }
        Ok(1.0 - l1 / l0)
    }
}

/// Share of samples where `round(mu) == y`.
pub fn accuracy(y: &DVector<f64>, mu: &DVector<f64>) -> Result<f64, GlmError> {
    check_lengths(y, mu)?;
    let hits = y
        .iter()
        .zip(mu.iter())
        .filter(|&(&yi, &mi)| (mi.round() - yi).abs() < 0.5)
        .count();
    Ok(hits as f64 / y.len() as f64)
}

/// Dispatch on `metric`.
pub fn score(
    metric: ScoreMetric,
    family: Family,
    y: &DVector<f64>,
    mu: &DVector<f64>,
    ynull: f64,
) -> Result<f64, GlmError> {
    match metric {
        ScoreMetric::Deviance => deviance(family, y, mu),
        ScoreMetric::PseudoR2 => pseudo_r2(family, y, mu, ynull),
        ScoreMetric::Accuracy => {
            if family != Family::Binomial {
                return Err(GlmError::UnsupportedForFamily {
                    operation: "accuracy",
                    family: family.display_name(),
                });
            }
            accuracy(y, mu)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn perfect_count_fit_has_zero_deviance_and_unit_r2() {
        let y = DVector::from_vec(vec![1.0, 2.0, 5.0, 3.0]);
        let ynull = y.mean();
        assert_abs_diff_eq!(deviance(Family::Poisson, &y, &y).unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pseudo_r2(Family::Poisson, &y, &y, ynull).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn null_prediction_scores_zero_r2() {
        let y = DVector::from_vec(vec![0.0, 2.0, 5.0, 1.0]);
        let ynull = y.mean();
        let mu = DVector::from_element(4, ynull);
        assert_abs_diff_eq!(pseudo_r2(Family::Poisson, &y, &mu, ynull).unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pseudo_r2(Family::Gaussian, &y, &mu, ynull).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn pseudo_r2_never_exceeds_one() {
        let y = DVector::from_vec(vec![0.0, 1.0, 7.0, 2.0, 0.0]);
        let ynull = y.mean();
        for mu in [
            DVector::from_vec(vec![0.1, 1.5, 6.0, 2.5, 0.2]),
            DVector::from_vec(vec![3.0, 0.1, 0.2, 9.0, 4.0]),
        ] {
            let r2 = pseudo_r2(Family::Poisson, &y, &mu, ynull).unwrap();
            assert!(r2 <= 1.0);
        }
    }

    #[test]
    fn constant_targets_make_r2_undefined() {
        let y = DVector::from_vec(vec![2.0, 2.0, 2.0]);
        let mu = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            pseudo_r2(Family::Poisson, &y, &mu, 2.0),
            Err(GlmError::InvalidTarget(_))
        ));
    }

    #[test]
    fn accuracy_rounds_probabilities() {
        let y = DVector::from_vec(vec![1.0, 0.0, 1.0, 0.0]);
        let mu = DVector::from_vec(vec![0.9, 0.2, 0.4, 0.6]);
        assert_abs_diff_eq!(accuracy(&y, &mu).unwrap(), 0.5);
        assert!(score(ScoreMetric::Accuracy, Family::Poisson, &y, &mu, 0.5).is_err());
    }

    #[test]
    fn length_mismatch_is_reported() {
        let y = DVector::from_vec(vec![1.0, 0.0]);
        let mu = DVector::from_vec(vec![1.0]);
        assert!(matches!(
            deviance(Family::Gaussian, &y, &mu),
            Err(GlmError::ShapeMismatch { .. })
        ));
    }
}
