//! Solvers for a single point of the regularization path.
//!
//! Given:
//! - a penalized objective (family, `eta`, `alpha`, `reg_lambda`, `X`, `y`)
//! - starting coefficients (warm start from the previous `reg_lambda`)
//!
//! we iterate until the relative change of `θ = (β₀, β)` drops below `tol`:
//!
//! ```text
//! ‖θ_new - θ_old‖ / max(‖θ_new‖, 1e-12) < tol
//! ```
//!
//! Two solvers are available:
//!
//! - **batch gradient**: proximal gradient descent. Step with `learning_rate` along
//!   the smooth gradient, soft-threshold the slopes at `learning_rate·λ·α`. A step that
//!   does not decrease the penalized loss is halved before being accepted, so an
//!   aggressive learning rate cannot blow up the exponential link. The shrunken
//!   step is kept for later iterations.
//! - **cdfast**: cyclic Newton coordinate descent. Each coordinate takes the
//!   proximal Newton step `β_k ← S(β_k - g_k/h_k, λα/h_k)`; the linear predictor is
//!   updated in place so a full pass costs `O(n·p)`.
//!
//! A solver that cannot find any descent step stops with `converged = false`.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::domain::Solver;
use crate::error::GlmError;
use crate::math::{soft_threshold, soft_threshold_mut};
use crate::models::{Objective, linear_predictor};

/// Maximum number of step halvings before a step is abandoned.
const MAX_HALVINGS: usize = 20;

/// Batch steps below `learning_rate * MIN_STEP_FRACTION` are treated as a stall.
const MIN_STEP_FRACTION: f64 = 1e-30;

/// Curvature below which a coordinate is left untouched.
const H_FLOOR: f64 = 1e-10;

/// Relative slack when comparing losses (guards against rounding ties).
const LOSS_SLACK: f64 = 1e-12;

/// Options shared by both solvers.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    pub solver: Solver,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tol: f64,
    /// When false the intercept is pinned at zero.
    pub fit_intercept: bool,
}

/// Result of solving one point of the path.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub beta0: f64,
    pub beta: DVector<f64>,
    pub n_iter: usize,
    pub converged: bool,
    /// Final penalized loss.
    pub loss: f64,
}

/// Minimize `obj` starting at `(beta0, beta)`.
pub fn solve(
    obj: &Objective,
    opts: &SolverOptions,
    beta0: f64,
    beta: DVector<f64>,
) -> Result<SolveOutcome, GlmError> {
    if obj.x.nrows() != obj.y.len() {
        return Err(GlmError::shape("targets", obj.x.nrows(), obj.y.len()));
    }
    let beta0 = if opts.fit_intercept { beta0 } else { 0.0 };

    match opts.solver {
        Solver::BatchGradient => solve_batch_gradient(obj, opts, beta0, beta),
        Solver::CdFast => solve_cdfast(obj, opts, beta0, beta),
    }
}

fn accepts(candidate: f64, current: f64) -> bool {
    candidate.is_finite() && candidate <= current + LOSS_SLACK * current.abs().max(1.0)
}

fn relative_change(old0: f64, old: &DVector<f64>, new0: f64, new: &DVector<f64>) -> f64 {
    let diff = ((new0 - old0).powi(2) + (new - old).norm_squared()).sqrt();
    let size = (new0 * new0 + new.norm_squared()).sqrt();
    diff / size.max(1e-12)
}

fn initial_loss(obj: &Objective, z: &DVector<f64>, beta: &DVector<f64>) -> Result<f64, GlmError> {
    let loss = obj.loss_at(z, beta);
    if !loss.is_finite() {
        return Err(GlmError::Diverged {
            reg_lambda: obj.reg_lambda,
            iteration: 0,
        });
    }
    Ok(loss)
}

fn solve_batch_gradient(
    obj: &Objective,
    opts: &SolverOptions,
    mut beta0: f64,
    mut beta: DVector<f64>,
) -> Result<SolveOutcome, GlmError> {
    let mut z = linear_predictor(obj.x, beta0, &beta)?;
    let mut loss = initial_loss(obj, &z, &beta)?;
    let l1_weight = obj.reg_lambda * obj.alpha;

    let mut n_iter = 0;
    let mut converged = false;
    let mut step = opts.learning_rate;

    for iter in 1..=opts.max_iter {
        n_iter = iter;
        let (g0, g) = obj.gradient(&z, &beta);

        let mut accepted = None;
        for _ in 0..=MAX_HALVINGS {
            let cand0 = if opts.fit_intercept { beta0 - step * g0 } else { 0.0 };
            let mut cand = &beta - &g * step;
            soft_threshold_mut(&mut cand, step * l1_weight);

            let cz = linear_predictor(obj.x, cand0, &cand)?;
            let cl = obj.loss_at(&cz, &cand);
            if accepts(cl, loss) {
                accepted = Some((cand0, cand, cz, cl));
                break;
            }
            step *= 0.5;
        }

        let Some((new0, new, new_z, new_loss)) = accepted else {
            // The shrunken step carries over to the next iteration.
            if step < opts.learning_rate * MIN_STEP_FRACTION {
                warn!(reg_lambda = obj.reg_lambda, iter, step, "batch gradient found no descent step");
                break;
            }
            debug!(reg_lambda = obj.reg_lambda, iter, step, "no descent step yet; continuing with smaller step");
            continue;
        };

        let change = relative_change(beta0, &beta, new0, &new);
        beta0 = new0;
        beta = new;
        z = new_z;
        loss = new_loss;

        if !beta0.is_finite() || beta.iter().any(|b| !b.is_finite()) {
            return Err(GlmError::Diverged {
                reg_lambda: obj.reg_lambda,
                iteration: iter,
            });
        }
        if change < opts.tol {
            converged = true;
            break;
        }
    }

    Ok(SolveOutcome {
        beta0,
        beta,
        n_iter,
        converged,
        loss,
    })
}

fn solve_cdfast(
    obj: &Objective,
    opts: &SolverOptions,
    mut beta0: f64,
    mut beta: DVector<f64>,
) -> Result<SolveOutcome, GlmError> {
    let x: &DMatrix<f64> = obj.x;
    let n = obj.n_samples().max(1) as f64;
    let l2_weight = obj.reg_lambda * (1.0 - obj.alpha);
    let l1_weight = obj.reg_lambda * obj.alpha;

    let mut z = linear_predictor(x, beta0, &beta)?;
    let mut loss = initial_loss(obj, &z, &beta)?;

    let mut n_iter = 0;
    let mut converged = false;

    for iter in 1..=opts.max_iter {
        n_iter = iter;
        let old0 = beta0;
        let old = beta.clone();
        // Set when a non-zero Newton move was rejected at every step size.
        let mut stalled = false;

        if opts.fit_intercept {
            let (g, h) = obj.sample_terms(&z);
            let h0 = h.sum() / n;
            let full = if h0.abs() > H_FLOOR { -(g.sum() / n) / h0.abs() } else { 0.0 };
            if full != 0.0 {
                let mut t = 1.0;
                let mut moved = false;
                for _ in 0..=MAX_HALVINGS {
                    let d = t * full;
                    let cz = z.add_scalar(d);
                    let cl = obj.loss_at(&cz, &beta);
                    if accepts(cl, loss) {
                        beta0 += d;
                        z = cz;
                        loss = cl;
                        moved = true;
                        break;
                    }
                    t *= 0.5;
                }
                stalled |= !moved;
            }
        }

        for k in 0..beta.len() {
            let (g, h) = obj.sample_terms(&z);
            let xk = x.column(k);
            let gk = xk.dot(&g) / n + l2_weight * beta[k];
            let hk = obj.coordinate_hessian(&h, k).abs();
            if hk <= H_FLOOR {
                continue;
            }

            let target = soft_threshold(beta[k] - gk / hk, l1_weight / hk);
            let full = target - beta[k];
            if full == 0.0 {
                continue;
            }

            let mut t = 1.0;
            let mut moved = false;
            for _ in 0..=MAX_HALVINGS {
                let d = t * full;
                let mut cand = beta.clone();
                cand[k] += d;
                let mut cz = z.clone();
                cz.axpy(d, &xk, 1.0);
                let cl = obj.loss_at(&cz, &cand);
                if accepts(cl, loss) {
                    beta = cand;
                    z = cz;
                    loss = cl;
                    moved = true;
                    break;
                }
                t *= 0.5;
            }
            stalled |= !moved;
        }

        if !beta0.is_finite() || beta.iter().any(|b| !b.is_finite()) {
            return Err(GlmError::Diverged {
                reg_lambda: obj.reg_lambda,
                iteration: iter,
            });
        }
        if relative_change(old0, &old, beta0, &beta) < opts.tol {
            if stalled {
                warn!(reg_lambda = obj.reg_lambda, iter, "coordinate descent found no descent step");
            } else {
                converged = true;
            }
            break;
        }
    }

    Ok(SolveOutcome {
        beta0,
        beta,
        n_iter,
        converged,
        loss,
    })
}
