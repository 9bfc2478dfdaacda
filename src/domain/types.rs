//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - selected from the command line (`clap::ValueEnum`)
//! - stored in model JSON files
//! - passed between the estimator, metrics and reporting code

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Target distribution (and its inverse link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Identity link, unit-variance Gaussian noise.
    Gaussian,
    /// Logistic link, Bernoulli targets in {0, 1}.
    Binomial,
    /// Canonical exponential link, linearized above `eta`.
    Poisson,
    /// Softplus link with Poisson targets.
    Softplus,
}

impl Family {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Family::Gaussian => "gaussian",
            Family::Binomial => "binomial",
            Family::Poisson => "poisson",
            Family::Softplus => "softplus",
        }
    }

    /// Whether targets are counts (and the saturated likelihood is non-trivial).
    pub fn is_count(self) -> bool {
        matches!(self, Family::Poisson | Family::Softplus)
    }
}

/// Optimizer used for each point on the regularization path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Solver {
    /// Proximal batch gradient descent with step halving.
    BatchGradient,
    /// Cyclic Newton coordinate descent.
    CdFast,
}

/// Goodness-of-fit metric returned by `score`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreMetric {
    Deviance,
    #[value(name = "pseudo-r2")]
    #[serde(rename = "pseudo-r2")]
    PseudoR2,
    Accuracy,
}

impl ScoreMetric {
    pub fn display_name(self) -> &'static str {
        match self {
            ScoreMetric::Deviance => "deviance",
            ScoreMetric::PseudoR2 => "pseudo-R2",
            ScoreMetric::Accuracy => "accuracy",
        }
    }

    /// Deviance is a loss; the other metrics are gains.
    pub fn higher_is_better(self) -> bool {
        !matches!(self, ScoreMetric::Deviance)
    }
}

/// Estimator hyperparameters as collected from the CLI.
#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub family: Family,
    pub alpha: f64,
    pub lambda_max: f64,
    pub lambda_min: f64,
    pub n_lambdas: usize,
    pub learning_rate: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub eta: f64,
    pub score_metric: ScoreMetric,
    pub solver: Solver,
    pub fit_intercept: bool,
    pub seed: u64,
}

/// Configuration for the simulate / fit / predict / score demo.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub estimator: EstimatorConfig,
    pub n_samples: usize,
    pub n_features: usize,
    pub density: f64,
    /// Number of true-vs-predicted rows to print.
    pub show: usize,
    pub export_model: Option<PathBuf>,
    pub export_predictions: Option<PathBuf>,
}

/// Configuration for fitting a path to a CSV dataset.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub estimator: EstimatorConfig,
    pub input: PathBuf,
    pub target: String,
    /// Cross-validation folds; `None` selects the last model on the path.
    pub cv_folds: Option<usize>,
    pub standardize: bool,
    pub export_model: Option<PathBuf>,
}

/// Configuration for scoring a saved model on a CSV dataset.
#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub model: PathBuf,
    pub input: PathBuf,
    pub target: Option<String>,
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_metric_serializes_kebab_case() {
        let s = serde_json::to_string(&ScoreMetric::PseudoR2).unwrap();
        assert_eq!(s, "\"pseudo-r2\"");
        let back: ScoreMetric = serde_json::from_str("\"deviance\"").unwrap();
        assert_eq!(back, ScoreMetric::Deviance);
    }

    #[test]
    fn only_deviance_is_minimized() {
        assert!(!ScoreMetric::Deviance.higher_is_better());
        assert!(ScoreMetric::PseudoR2.higher_is_better());
        assert!(ScoreMetric::Accuracy.higher_is_better());
    }

    #[test]
    fn count_families() {
        assert!(Family::Poisson.is_count());
        assert!(Family::Softplus.is_count());
        assert!(!Family::Gaussian.is_count());
        assert!(!Family::Binomial.is_count());
    }
}
