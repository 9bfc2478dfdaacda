//! Elastic-net penalized GLM fit along a regularization path.
//!
//! Usage mirrors the classic estimator workflow:
//!
//! ```text
//! let glm  = Glm::new(GlmParams::new(Family::Poisson).eta(4.0))?;  // construct
//! let y    = glm.simulate(beta0, &beta, &x, &mut rng)?;             // simulate
//! let path = glm.fit(&x, &y)?;                                      // one model per λ
//! let m    = path.last();                                           // select
//! let yhat = m.predict(&x)?;                                        // predict
//! let r2   = m.score(&x, &y)?;                                      // score
//! ```
//!
//! Path points are solved in the order given by `reg_lambda`, each warm-started from
//! the previous solution. The first point starts from small random coefficients
//! `N(0, 1) / (p + 1)` drawn from `seed`, so fits are reproducible.

use std::ops::Index;

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, warn};

use crate::domain::{Family, ScoreMetric, Solver};
use crate::error::GlmError;
use crate::fit::solver::{SolverOptions, solve};
use crate::math::{log_space, sigmoid};
use crate::models::{Objective, linear_predictor, mean_response};

/// Estimator hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GlmParams {
    pub family: Family,
    /// Mix between L1 (`alpha = 1`) and L2 (`alpha = 0`) penalties.
    pub alpha: f64,
    /// Regularization strengths, solved in this order.
    pub reg_lambda: Vec<f64>,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tol: f64,
    /// Threshold above which the Poisson link is linearized.
    pub eta: f64,
    pub score_metric: ScoreMetric,
    pub solver: Solver,
    pub fit_intercept: bool,
    pub seed: u64,
}

impl GlmParams {
    /// Defaults: `alpha = 0.5`, ten λ values from 0.5 down to 0.01, `learning_rate = 0.2`,
    /// `max_iter = 1000`, `tol = 1e-6`, `eta = 2.0`, deviance scoring, batch gradient.
    pub fn new(family: Family) -> Self {
        Self {
            family,
            alpha: 0.5,
            reg_lambda: default_reg_lambda(),
            learning_rate: 2e-1,
            max_iter: 1000,
            tol: 1e-6,
            eta: 2.0,
            score_metric: ScoreMetric::Deviance,
            solver: Solver::BatchGradient,
            fit_intercept: true,
            seed: 0,
        }
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn reg_lambda(mut self, reg_lambda: Vec<f64>) -> Self {
        self.reg_lambda = reg_lambda;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    pub fn score_metric(mut self, score_metric: ScoreMetric) -> Self {
        self.score_metric = score_metric;
        self
    }

    pub fn solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every hyperparameter; the first violation is reported.
    pub fn validate(&self) -> Result<(), GlmError> {
        if !(self.alpha.is_finite() && (0.0..=1.0).contains(&self.alpha)) {
            return Err(GlmError::InvalidParameter(format!(
                "alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(GlmError::InvalidParameter(format!(
                "learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        if self.max_iter == 0 {
            return Err(GlmError::InvalidParameter("max_iter must be >= 1".into()));
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(GlmError::InvalidParameter(format!("tol must be > 0, got {}", self.tol)));
        }
        if !self.eta.is_finite() {
            return Err(GlmError::InvalidParameter("eta must be finite".into()));
        }
        if self.reg_lambda.is_empty() {
            return Err(GlmError::InvalidParameter("reg_lambda path is empty".into()));
        }
        if let Some(bad) = self.reg_lambda.iter().find(|l| !(l.is_finite() && **l >= 0.0)) {
            return Err(GlmError::InvalidParameter(format!(
                "reg_lambda values must be finite and >= 0, got {bad}"
            )));
        }
        if self.score_metric == ScoreMetric::Accuracy && self.family != Family::Binomial {
            return Err(GlmError::UnsupportedForFamily {
                operation: "accuracy scoring",
                family: self.family.display_name(),
            });
        }
        Ok(())
    }
}

/// `logspace(ln 0.5, ln 0.01, 10, base e)`.
pub fn default_reg_lambda() -> Vec<f64> {
    // Constant bounds; this cannot fail.
    log_space(0.5, 0.01, 10).unwrap_or_else(|_| vec![0.5, 0.01])
}

/// Check that targets are admissible for `family`.
pub fn validate_targets(family: Family, y: &DVector<f64>) -> Result<(), GlmError> {
    if y.is_empty() {
        return Err(GlmError::InvalidTarget("no samples".into()));
    }
    if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
        return Err(GlmError::InvalidTarget(format!("non-finite target {bad}")));
    }
    match family {
        Family::Gaussian => Ok(()),
        Family::Binomial => match y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            Some(bad) => Err(GlmError::InvalidTarget(format!(
                "binomial targets must be 0 or 1, got {bad}"
            ))),
            None => Ok(()),
        },
        Family::Poisson | Family::Softplus => match y.iter().find(|&&v| v < 0.0) {
            Some(bad) => Err(GlmError::InvalidTarget(format!(
                "{} targets must be non-negative, got {bad}",
                family.display_name()
            ))),
            None => Ok(()),
        },
    }
}

/// An unfitted estimator.
#[derive(Debug, Clone)]
pub struct Glm {
    params: GlmParams,
}

impl Glm {
    /// Construct an estimator after validating its hyperparameters.
    pub fn new(params: GlmParams) -> Result<Self, GlmError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &GlmParams {
        &self.params
    }

    /// Draw targets from this estimator's family given true coefficients.
    pub fn simulate<R: rand::Rng + ?Sized>(
        &self,
        beta0: f64,
        beta: &DVector<f64>,
        x: &DMatrix<f64>,
        rng: &mut R,
    ) -> Result<DVector<f64>, GlmError> {
        crate::data::simulate(self.params.family, self.params.eta, beta0, beta, x, rng)
    }

    /// Fit one model per `reg_lambda` value.
    pub fn fit(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<GlmPath, GlmError> {
        let p = &self.params;
        if x.nrows() != y.len() {
            return Err(GlmError::shape("targets", x.nrows(), y.len()));
        }
        validate_targets(p.family, y)?;

        let n_features = x.ncols();
        let (mut beta0, mut beta) = initial_coefficients(n_features, p.seed)?;
        if !p.fit_intercept {
            beta0 = 0.0;
        }
        let ynull = y.mean();

        let opts = SolverOptions {
            solver: p.solver,
            learning_rate: p.learning_rate,
            max_iter: p.max_iter,
            tol: p.tol,
            fit_intercept: p.fit_intercept,
        };

        let mut models = Vec::with_capacity(p.reg_lambda.len());
        for &reg_lambda in &p.reg_lambda {
            let obj = Objective {
                family: p.family,
                eta: p.eta,
                alpha: p.alpha,
                reg_lambda,
                x,
                y,
            };
            let out = solve(&obj, &opts, beta0, beta.clone())?;

            let nnz = out.beta.iter().filter(|&&b| b != 0.0).count();
            if out.converged {
                debug!(reg_lambda, n_iter = out.n_iter, loss = out.loss, nnz, "path point converged");
            } else {
                warn!(reg_lambda, max_iter = p.max_iter, loss = out.loss, "path point did not converge");
            }

            beta0 = out.beta0;
            beta = out.beta.clone();
            models.push(FittedGlm {
                family: p.family,
                eta: p.eta,
                alpha: p.alpha,
                reg_lambda,
                beta0: out.beta0,
                beta: out.beta,
                ynull,
                score_metric: p.score_metric,
                n_iter: out.n_iter,
                converged: out.converged,
            });
        }

        Ok(GlmPath { models })
    }
}

fn initial_coefficients(n_features: usize, seed: u64) -> Result<(f64, DVector<f64>), GlmError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| GlmError::InvalidParameter(format!("initializer distribution: {e}")))?;
    let scale = 1.0 / (n_features as f64 + 1.0);
    let beta0 = scale * normal.sample(&mut rng);
    let beta = DVector::from_fn(n_features, |_, _| scale * normal.sample(&mut rng));
    Ok((beta0, beta))
}

/// One fitted model of the path.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedGlm {
    pub family: Family,
    pub eta: f64,
    pub alpha: f64,
    pub reg_lambda: f64,
    pub beta0: f64,
    pub beta: DVector<f64>,
    /// Mean of the training targets; the null model for pseudo-R².
    pub ynull: f64,
    pub score_metric: ScoreMetric,
    pub n_iter: usize,
    pub converged: bool,
}

impl FittedGlm {
    pub fn n_features(&self) -> usize {
        self.beta.len()
    }

    /// Number of non-zero slope coefficients.
    pub fn n_nonzero(&self) -> usize {
        self.beta.iter().filter(|&&b| b != 0.0).count()
    }

    /// Linear predictor `β₀ + Xβ`.
    pub fn decision_function(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, GlmError> {
        linear_predictor(x, self.beta0, &self.beta)
    }

    /// Predicted mean response.
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, GlmError> {
        let z = self.decision_function(x)?;
        Ok(mean_response(self.family, self.eta, &z))
    }

    /// Class-1 probabilities (binomial only).
    pub fn predict_proba(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, GlmError> {
        if self.family != Family::Binomial {
            return Err(GlmError::UnsupportedForFamily {
                operation: "predict_proba",
                family: self.family.display_name(),
            });
        }
        Ok(self.decision_function(x)?.map(sigmoid))
    }

    /// Hard 0/1 labels at probability 0.5 (binomial only).
    pub fn predict_class(&self, x: &DMatrix<f64>) -> Result<DVector<f64>, GlmError> {
        Ok(self.predict_proba(x)?.map(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Score on `(x, y)` with the configured metric.
    pub fn score(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<f64, GlmError> {
        self.score_with(self.score_metric, x, y)
    }

    /// Score with an explicit metric.
    pub fn score_with(
        &self,
        metric: ScoreMetric,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
    ) -> Result<f64, GlmError> {
        if x.nrows() != y.len() {
            return Err(GlmError::shape("targets", x.nrows(), y.len()));
        }
        let mu = self.predict(x)?;
        crate::metrics::score(metric, self.family, y, &mu, self.ynull)
    }
}

/// Fitted models in `reg_lambda` order.
#[derive(Debug, Clone, PartialEq)]
pub struct GlmPath {
    models: Vec<FittedGlm>,
}

impl GlmPath {
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FittedGlm> {
        self.models.get(index)
    }

    /// The least regularized model when λ decreases along the path.
    ///
    /// Paths are only built by `Glm::fit`, which rejects an empty `reg_lambda`.
    pub fn last(&self) -> &FittedGlm {
        &self.models[self.models.len() - 1]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FittedGlm> {
        self.models.iter()
    }

    pub fn reg_lambda(&self) -> Vec<f64> {
        self.models.iter().map(|m| m.reg_lambda).collect()
    }

    /// Score every model of the path on `(x, y)`.
    pub fn score_all(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Vec<f64>, GlmError> {
        self.models.iter().map(|m| m.score(x, y)).collect()
    }
}

impl Index<usize> for GlmPath {
    type Output = FittedGlm;

    fn index(&self, index: usize) -> &Self::Output {
        &self.models[index]
    }
}

impl<'a> IntoIterator for &'a GlmPath {
    type Item = &'a FittedGlm;
    type IntoIter = std::slice::Iter<'a, FittedGlm>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
