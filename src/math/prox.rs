//! Proximal operators and regularization grids.

use nalgebra::DVector;

use crate::error::GlmError;

/// Soft-thresholding: `sign(v) · max(|v| - t, 0)`.
pub fn soft_threshold(v: f64, t: f64) -> f64 {
    if v > t {
        v - t
    } else if v < -t {
        v + t
    } else {
        0.0
    }
}

/// Apply [`soft_threshold`] to every entry in place.
pub fn soft_threshold_mut(beta: &mut DVector<f64>, t: f64) {
    for b in beta.iter_mut() {
        *b = soft_threshold(*b, t);
    }
}

/// Generate `steps` geometrically spaced points from `start` to `end` (inclusive).
///
/// `start > end` is allowed and yields a decreasing sequence, which is the usual
/// shape of a regularization path.
pub fn log_space(start: f64, end: f64, steps: usize) -> Result<Vec<f64>, GlmError> {
    if !(start.is_finite() && end.is_finite() && start > 0.0 && end > 0.0) {
        return Err(GlmError::InvalidParameter(format!(
            "log-space bounds must be finite and > 0 (start={start}, end={end})"
        )));
    }
    if steps < 2 {
        return Err(GlmError::InvalidParameter("log-space steps must be >= 2".into()));
    }

    let ln_start = start.ln();
    let ln_end = end.ln();
    let step = (ln_end - ln_start) / (steps as f64 - 1.0);

    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push((ln_start + step * i as f64).exp());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn soft_threshold_shrinks_and_zeroes() {
        assert_eq!(soft_threshold(0.3, 0.5), 0.0);
        assert_eq!(soft_threshold(-0.3, 0.5), 0.0);
        assert_abs_diff_eq!(soft_threshold(2.0, 0.5), 1.5);
        assert_abs_diff_eq!(soft_threshold(-2.0, 0.5), -1.5);

        let mut v = DVector::from_vec(vec![0.1, -3.0, 0.0]);
        soft_threshold_mut(&mut v, 1.0);
        assert_eq!(v.as_slice(), &[0.0, -2.0, 0.0]);
    }

    #[test]
    fn log_space_includes_endpoints_in_either_direction() {
        let up = log_space(0.1, 10.0, 5).unwrap();
        assert_abs_diff_eq!(up[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(up[2], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(up[4], 10.0, epsilon = 1e-12);

        let down = log_space(0.5, 0.01, 10).unwrap();
        assert_eq!(down.len(), 10);
        assert_abs_diff_eq!(down[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(down[9], 0.01, epsilon = 1e-12);
        assert!(down.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn log_space_rejects_bad_bounds() {
        assert!(log_space(0.0, 1.0, 5).is_err());
        assert!(log_space(1.0, f64::NAN, 5).is_err());
        assert!(log_space(1.0, 2.0, 1).is_err());
    }
}
