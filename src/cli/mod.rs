//! Command-line parsing for the GLM path fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the estimator/math code.
//!
//! Every estimator flag and `--log-level` can also be set through a `GLM_*` environment
//! variable (a `.env` file in the working directory is loaded first); explicit flags win.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Family, ScoreMetric, Solver};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "glm", version, about = "Elastic-net GLM regularization paths (Poisson, binomial, gaussian, softplus)")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, global = true, env = "GLM_LOG_LEVEL", default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the linearized exponential link next to exp(z).
    Link(LinkArgs),
    /// Simulate data from a sparse model, fit the path, predict and score.
    Demo(DemoArgs),
    /// Fit a path to a CSV dataset and optionally export the selected model.
    Fit(FitArgs),
    /// Predict (and score, if targets are present) with a saved model.
    Predict(PredictArgs),
}

/// Estimator hyperparameters shared by `demo` and `fit`.
#[derive(Debug, Args, Clone)]
pub struct EstimatorArgs {
    /// Target distribution.
    #[arg(long = "distr", value_enum, env = "GLM_DISTR", default_value_t = Family::Poisson)]
    pub family: Family,

    /// Elastic-net mixing: 1 = lasso, 0 = ridge.
    #[arg(long, env = "GLM_ALPHA", default_value_t = 0.05)]
    pub alpha: f64,

    /// Largest (first) regularization strength on the path.
    #[arg(long, env = "GLM_LAMBDA_MAX", default_value_t = 0.5)]
    pub lambda_max: f64,

    /// Smallest (last) regularization strength on the path.
    #[arg(long, env = "GLM_LAMBDA_MIN", default_value_t = 0.01)]
    pub lambda_min: f64,

    /// Number of log-spaced path points.
    #[arg(long, env = "GLM_N_LAMBDAS", default_value_t = 10)]
    pub n_lambdas: usize,

    /// Batch-gradient step size.
    #[arg(long, env = "GLM_LEARNING_RATE", default_value_t = 0.2)]
    pub learning_rate: f64,

    /// Maximum iterations per path point.
    #[arg(long, env = "GLM_MAX_ITER", default_value_t = 1000)]
    pub max_iter: usize,

    /// Convergence tolerance on the relative coefficient change.
    #[arg(long, env = "GLM_TOL", default_value_t = 1e-6)]
    pub tol: f64,

    /// Threshold above which the Poisson link is linearized.
    #[arg(long, env = "GLM_ETA", default_value_t = 4.0)]
    pub eta: f64,

    /// Score reported by `score`.
    #[arg(long, value_enum, env = "GLM_SCORE_METRIC", default_value_t = ScoreMetric::PseudoR2)]
    pub score_metric: ScoreMetric,

    /// Optimizer.
    #[arg(long, value_enum, env = "GLM_SOLVER", default_value_t = Solver::BatchGradient)]
    pub solver: Solver,

    /// Pin the intercept at zero.
    #[arg(long, env = "GLM_NO_INTERCEPT")]
    pub no_intercept: bool,

    /// Random seed (initialization, simulation, fold assignment).
    #[arg(long, env = "GLM_SEED", default_value_t = 42)]
    pub seed: u64,
}

/// Options for printing the link comparison.
#[derive(Debug, Args)]
pub struct LinkArgs {
    #[arg(long, default_value_t = 4.0)]
    pub eta: f64,

    #[arg(long, default_value_t = 0.0)]
    pub z_min: f64,

    #[arg(long, default_value_t = 10.0)]
    pub z_max: f64,

    #[arg(long, default_value_t = 100)]
    pub steps: usize,
}

/// Options for the simulate / fit / predict / score demo.
#[derive(Debug, Args)]
pub struct DemoArgs {
    #[command(flatten)]
    pub estimator: EstimatorArgs,

    /// Samples in each of the train and test sets.
    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub n_samples: usize,

    /// Number of features.
    #[arg(short = 'p', long, default_value_t = 100)]
    pub n_features: usize,

    /// Share of features with a non-zero true coefficient.
    #[arg(long, default_value_t = 0.1)]
    pub density: f64,

    /// Rows of the true-vs-predicted table.
    #[arg(long, default_value_t = 20)]
    pub show: usize,

    /// Export the selected model to JSON.
    #[arg(long = "export-model")]
    pub export_model: Option<PathBuf>,

    /// Export test-set predictions to CSV.
    #[arg(long = "export-predictions")]
    pub export_predictions: Option<PathBuf>,
}

/// Options for fitting a CSV dataset.
#[derive(Debug, Args)]
pub struct FitArgs {
    #[command(flatten)]
    pub estimator: EstimatorArgs,

    /// Input CSV (header row, numeric columns).
    #[arg(short = 'f', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Target column name.
    #[arg(short = 't', long)]
    pub target: String,

    /// Choose λ by k-fold cross-validation instead of taking the last path point.
    #[arg(long)]
    pub cv_folds: Option<usize>,

    /// Fit on raw features (skip standardization).
    #[arg(long)]
    pub no_standardize: bool,

    /// Export the selected model to JSON.
    #[arg(long = "export-model")]
    pub export_model: Option<PathBuf>,
}

/// Options for predicting with a saved model.
#[derive(Debug, Args)]
pub struct PredictArgs {
    /// Model JSON produced by `glm fit --export-model`.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,

    /// Input CSV with the model's feature columns.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Target column; when given, the model is scored.
    #[arg(short = 't', long)]
    pub target: Option<String>,

    /// Write predictions to CSV instead of only printing a preview.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_defaults_reproduce_reference_settings() {
        let cli = Cli::try_parse_from(["glm", "demo"]).unwrap();
        let Command::Demo(args) = cli.command else {
            panic!("expected demo");
        };
        assert_eq!(args.n_samples, 10_000);
        assert_eq!(args.n_features, 100);
        assert_eq!(args.estimator.family, Family::Poisson);
        assert_eq!(args.estimator.score_metric, ScoreMetric::PseudoR2);
        assert_eq!(args.estimator.eta, 4.0);
        assert_eq!(args.estimator.alpha, 0.05);
        assert_eq!(args.estimator.n_lambdas, 10);
    }

    #[test]
    fn fit_parses_value_enums() {
        let cli = Cli::try_parse_from([
            "glm", "--log-level", "debug", "fit", "-f", "data.csv", "-t", "y", "--distr", "binomial",
            "--solver", "cd-fast", "--score-metric", "accuracy", "--cv-folds", "5",
        ])
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.estimator.family, Family::Binomial);
        assert_eq!(args.estimator.solver, Solver::CdFast);
        assert_eq!(args.estimator.score_metric, ScoreMetric::Accuracy);
        assert_eq!(args.cv_folds, Some(5));
    }

    #[test]
    fn every_estimator_flag_has_an_env_var() {
        use clap::CommandFactory;

        let cmd = Cli::command();
        for sub in ["demo", "fit"] {
            let sub = cmd.find_subcommand(sub).unwrap();
            for id in [
                "family", "alpha", "lambda_max", "lambda_min", "n_lambdas", "learning_rate",
                "max_iter", "tol", "eta", "score_metric", "solver", "no_intercept", "seed",
            ] {
                let arg = sub.get_arguments().find(|a| a.get_id() == id).unwrap();
                let env = arg.get_env().and_then(|e| e.to_str()).unwrap_or("");
                assert!(env.starts_with("GLM_"), "{id} has no GLM_* env var");
            }
        }
    }

    #[test]
    fn fit_requires_input_and_target() {
        assert!(Cli::try_parse_from(["glm", "fit", "-t", "y"]).is_err());
        assert!(Cli::try_parse_from(["glm", "fit", "-f", "x.csv"]).is_err());
    }
}
