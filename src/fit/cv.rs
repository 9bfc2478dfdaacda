//! K-fold cross-validation over the regularization path.
//!
//! Procedure:
//! 1. Shuffle row indices with `seed` and cut them into `k` contiguous folds.
//! 2. For each fold (in parallel), fit the whole path on the other folds and score
//!    every path model on the held-out fold.
//! 3. Average the scores per λ and pick the best index (max for gains, min for
//!    deviance). Ties go to the earlier, more regularized, index.
//! 4. Refit the full path on all rows and return the model at the chosen index.

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::info;

use crate::error::GlmError;
use crate::fit::estimator::{FittedGlm, Glm, GlmParams, GlmPath};

/// Output of a cross-validated fit.
#[derive(Debug, Clone)]
pub struct CvResult {
    /// Mean held-out score per λ.
    pub scores: Vec<f64>,
    /// `fold_scores[fold][lambda]`.
    pub fold_scores: Vec<Vec<f64>>,
    pub best_index: usize,
    pub best_reg_lambda: f64,
    /// Path refit on all rows.
    pub path: GlmPath,
    pub best: FittedGlm,
}

/// Cross-validating estimator.
#[derive(Debug, Clone)]
pub struct GlmCv {
    glm: Glm,
    n_folds: usize,
}

impl GlmCv {
    pub fn new(params: GlmParams, n_folds: usize) -> Result<Self, GlmError> {
        if n_folds < 2 {
            return Err(GlmError::InvalidParameter(format!(
                "cross-validation needs at least 2 folds, got {n_folds}"
            )));
        }
        Ok(Self {
            glm: Glm::new(params)?,
            n_folds,
        })
    }

    pub fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<CvResult, GlmError> {
        let n = y.len();
        if x.nrows() != n {
            return Err(GlmError::shape("targets", x.nrows(), n));
        }
        if n < self.n_folds {
            return Err(GlmError::InvalidParameter(format!(
                "{n} samples cannot be split into {} folds",
                self.n_folds
            )));
        }

        let folds = fold_indices(n, self.n_folds, self.glm.params().seed);

        let fold_scores: Vec<Vec<f64>> = folds
            .par_iter()
            .map(|test_idx| self.score_fold(x, y, test_idx))
            .collect::<Result<_, _>>()?;

        let metric = self.glm.params().score_metric;
        let n_lambdas = self.glm.params().reg_lambda.len();
        let scores: Vec<f64> = (0..n_lambdas)
            .map(|l| fold_scores.iter().map(|f| f[l]).sum::<f64>() / fold_scores.len() as f64)
            .collect();

        let best_index = select_best(&scores, metric.higher_is_better());
        let path = self.glm.fit(x, y)?;
        let best = path[best_index].clone();
        info!(
            best_index,
            reg_lambda = best.reg_lambda,
            score = scores[best_index],
            metric = metric.display_name(),
            "cross-validation selected model"
        );

        Ok(CvResult {
            scores,
            fold_scores,
            best_index,
            best_reg_lambda: best.reg_lambda,
            path,
            best,
        })
    }

    fn score_fold(
        &self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        test_idx: &[usize],
    ) -> Result<Vec<f64>, GlmError> {
        let mut is_test = vec![false; y.len()];
        for &i in test_idx {
            is_test[i] = true;
        }
        let train_idx: Vec<usize> = (0..y.len()).filter(|&i| !is_test[i]).collect();

        let (x_train, y_train) = take_rows(x, y, &train_idx);
        let (x_test, y_test) = take_rows(x, y, test_idx);

        let path = self.glm.fit(&x_train, &y_train)?;
        path.score_all(&x_test, &y_test)
    }
}

/// Shuffle `0..n` and split into `k` contiguous folds whose sizes differ by at most 1.
fn fold_indices(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let base = n / k;
    let extra = n % k;
    let mut out = Vec::with_capacity(k);
    let mut start = 0;
    for f in 0..k {
        let size = base + usize::from(f < extra);
        out.push(idx[start..start + size].to_vec());
        start += size;
    }
    out
}

fn take_rows(x: &DMatrix<f64>, y: &DVector<f64>, rows: &[usize]) -> (DMatrix<f64>, DVector<f64>) {
    let xs = DMatrix::from_fn(rows.len(), x.ncols(), |i, j| x[(rows[i], j)]);
    let ys = DVector::from_fn(rows.len(), |i, _| y[rows[i]]);
    (xs, ys)
}

/// Deterministic selection: best score; ties broken by the lower index.
fn select_best(scores: &[f64], higher_is_better: bool) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        let current = scores[best];
        let better = if higher_is_better { s > current } else { s < current };
        if better || (!current.is_finite() && s.is_finite()) {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Family, ScoreMetric};

    #[test]
    fn folds_partition_all_rows() {
        let folds = fold_indices(11, 3, 5);
        assert_eq!(folds.len(), 3);
        let sizes: Vec<usize> = folds.iter().map(|f| f.len()).collect();
        assert_eq!(sizes, vec![4, 4, 3]);
        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn selection_direction_and_ties() {
        let scores = [0.2, 0.5, 0.5, 0.1];
        assert_eq!(select_best(&scores, true), 1);
        assert_eq!(select_best(&scores, false), 3);
        assert_eq!(select_best(&[f64::NAN, 0.3], true), 1);
    }

    #[test]
    fn rejects_bad_fold_counts() {
        let params = GlmParams::new(Family::Poisson);
        assert!(GlmCv::new(params.clone(), 1).is_err());

        let cv = GlmCv::new(params, 5).unwrap();
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let y = DVector::from_vec(vec![1.0, 0.0, 2.0]);
        assert!(cv.fit(&x, &y).is_err());
    }

    #[test]
    fn cv_picks_an_index_on_the_path() {
        let mut rng = StdRng::seed_from_u64(11);
        let x = crate::data::gaussian_design(400, 4, &mut rng).unwrap();
        let beta = DVector::from_vec(vec![0.5, 0.0, -0.4, 0.0]);
        let y = crate::data::simulate(Family::Poisson, 4.0, 0.2, &beta, &x, &mut rng).unwrap();

        let params = GlmParams::new(Family::Poisson)
            .reg_lambda(vec![1.0, 0.1, 0.01])
            .alpha(0.5)
            .score_metric(ScoreMetric::PseudoR2);
        let result = GlmCv::new(params, 3).unwrap().fit(&x, &y).unwrap();

        assert_eq!(result.scores.len(), 3);
        assert_eq!(result.fold_scores.len(), 3);
        assert!(result.best_index < 3);
        assert_eq!(result.best, result.path[result.best_index]);
        // λ = 1 with alpha = 0.5 shrinks the signal away; it cannot win.
        assert_ne!(result.best_index, 0);
        assert!(result.scores.iter().all(|s| *s <= 1.0));
    }
}
