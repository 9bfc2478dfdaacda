//! Shared pipelines behind the `demo`, `fit` and `predict` commands.
//!
//! Each pipeline returns its computed outputs; printing and exporting stays in
//! `app.rs` so the workflows can be exercised directly from tests.

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::data::{Standardizer, gaussian_design, gaussian_intercept, sparse_coefficients};
use crate::domain::{DemoConfig, EstimatorConfig, FitConfig, PredictConfig};
use crate::error::AppError;
use crate::fit::{CvResult, FittedGlm, Glm, GlmCv, GlmParams, GlmPath};
use crate::io::{Dataset, ModelFile, load_csv, read_model_json};
use crate::math::{LinkPoint, link_curve, log_space, pearson_correlation};
use crate::report::{PathRow, summarize_path};

/// Link comparison range printed at the start of the demo.
const DEMO_LINK_Z_MAX: f64 = 10.0;
const DEMO_LINK_STEPS: usize = 100;

/// Translate CLI-level estimator settings into validated estimator parameters.
pub fn estimator_params(config: &EstimatorConfig) -> Result<GlmParams, AppError> {
    let reg_lambda = log_space(config.lambda_max, config.lambda_min, config.n_lambdas)?;
    let params = GlmParams::new(config.family)
        .alpha(config.alpha)
        .reg_lambda(reg_lambda)
        .learning_rate(config.learning_rate)
        .max_iter(config.max_iter)
        .tol(config.tol)
        .eta(config.eta)
        .score_metric(config.score_metric)
        .solver(config.solver)
        .fit_intercept(config.fit_intercept)
        .seed(config.seed);
    params.validate()?;
    Ok(params)
}

/// All computed outputs of a `glm demo` run.
#[derive(Debug, Clone)]
pub struct DemoOutput {
    pub link: Vec<LinkPoint>,
    pub beta_true: DVector<f64>,
    pub path: GlmPath,
    /// Path scored on the (scaled) training data.
    pub path_rows: Vec<PathRow>,
    pub scaler: Standardizer,
    pub y_test: DVector<f64>,
    pub y_pred: DVector<f64>,
    pub train_score: f64,
    pub test_score: f64,
    /// Pearson correlation of test predictions with test targets.
    pub correlation: Option<f64>,
}

impl DemoOutput {
    /// The model used for prediction: the last (least regularized) path point.
    pub fn selected(&self) -> &FittedGlm {
        self.path.last()
    }
}

/// Simulate train/test data from a sparse true model, fit the path on standardized
/// training features, then predict and score the held-out set.
pub fn run_demo(config: &DemoConfig) -> Result<DemoOutput, AppError> {
    let params = estimator_params(&config.estimator)?;
    let glm = Glm::new(params)?;
    let eta = config.estimator.eta;

    let link = link_curve(eta, 0.0, DEMO_LINK_Z_MAX, DEMO_LINK_STEPS);

    let mut rng = StdRng::seed_from_u64(config.estimator.seed);
    let beta0_true = gaussian_intercept(&mut rng)?;
    let beta_true = sparse_coefficients(config.n_features, config.density, &mut rng)?;

    let x_train = gaussian_design(config.n_samples, config.n_features, &mut rng)?;
    let y_train = glm.simulate(beta0_true, &beta_true, &x_train, &mut rng)?;
    let x_test = gaussian_design(config.n_samples, config.n_features, &mut rng)?;
    let y_test = glm.simulate(beta0_true, &beta_true, &x_test, &mut rng)?;
    info!(
        n_samples = config.n_samples,
        n_features = config.n_features,
        true_nonzero = beta_true.iter().filter(|&&b| b != 0.0).count(),
        "simulated train and test sets"
    );

    let (scaler, x_train_scaled) = Standardizer::fit_transform(&x_train)?;
    let x_test_scaled = scaler.transform(&x_test)?;

    let path = glm.fit(&x_train_scaled, &y_train)?;
    info!(n_models = path.len(), "fitted regularization path");
    let path_rows = summarize_path(&path, &x_train_scaled, &y_train)?;

    let model = path.last();
    let y_pred = model.predict(&x_test_scaled)?;
    let train_score = model.score(&x_train_scaled, &y_train)?;
    let test_score = model.score(&x_test_scaled, &y_test)?;
    let correlation = pearson_correlation(y_pred.as_slice(), y_test.as_slice());

    Ok(DemoOutput {
        link,
        beta_true,
        path,
        path_rows,
        scaler,
        y_test,
        y_pred,
        train_score,
        test_score,
        correlation,
    })
}

/// All computed outputs of a `glm fit` run.
#[derive(Debug, Clone)]
pub struct FitOutput {
    pub dataset: Dataset,
    pub targets: DVector<f64>,
    pub scaler: Option<Standardizer>,
    pub path: GlmPath,
    /// Path scored on the fitted rows.
    pub path_rows: Vec<PathRow>,
    pub cv: Option<CvResult>,
    pub selected_index: usize,
}

impl FitOutput {
    pub fn selected(&self) -> &FittedGlm {
        &self.path[self.selected_index]
    }

    /// Model file for the selected path point.
    pub fn model_file(&self) -> ModelFile {
        ModelFile::from_fit(
            self.selected(),
            self.dataset.feature_names.clone(),
            self.scaler.as_ref(),
        )
    }
}

/// Load a CSV dataset, fit the path and select a model (last point or CV best).
pub fn run_fit(config: &FitConfig) -> Result<FitOutput, AppError> {
    let params = estimator_params(&config.estimator)?;

    let dataset = load_csv(&config.input, Some(config.target.as_str()), None)?;
    let targets = dataset
        .y
        .clone()
        .ok_or_else(|| AppError::new(2, format!("Missing target column: `{}`", config.target)))?;
    info!(
        rows = dataset.rows_used,
        features = dataset.feature_names.len(),
        "loaded dataset"
    );

    let (scaler, x) = if config.standardize {
        let (scaler, x) = Standardizer::fit_transform(&dataset.x)?;
        (Some(scaler), x)
    } else {
        (None, dataset.x.clone())
    };

    let (path, cv, selected_index) = match config.cv_folds {
        Some(k) => {
            let cv = GlmCv::new(params, k)?.fit(&x, &targets)?;
            let best = cv.best_index;
            (cv.path.clone(), Some(cv), best)
        }
        None => {
            let path = Glm::new(params)?.fit(&x, &targets)?;
            let last = path.len() - 1;
            (path, None, last)
        }
    };
    let path_rows = summarize_path(&path, &x, &targets)?;

    Ok(FitOutput {
        dataset,
        targets,
        scaler,
        path,
        path_rows,
        cv,
        selected_index,
    })
}

/// All computed outputs of a `glm predict` run.
#[derive(Debug, Clone)]
pub struct PredictOutput {
    pub model: ModelFile,
    pub dataset: Dataset,
    pub y_pred: DVector<f64>,
    /// Score with the model's metric, when the input carried targets.
    pub score: Option<f64>,
}

/// Load a saved model, align and transform the input columns, then predict.
pub fn run_predict(config: &PredictConfig) -> Result<PredictOutput, AppError> {
    let model = read_model_json(&config.model)?;
    let dataset = load_csv(
        &config.input,
        config.target.as_deref(),
        Some(model.feature_names.as_slice()),
    )?;

    let x: DMatrix<f64> = match model.standardizer() {
        Some(scaler) => scaler.transform(&dataset.x)?,
        None => dataset.x.clone(),
    };

    let fit = model.to_fit();
    let y_pred = fit.predict(&x)?;
    let score = match &dataset.y {
        Some(y) => Some(fit.score(&x, y)?),
        None => None,
    };
    info!(rows = y_pred.len(), "predicted");

    Ok(PredictOutput {
        model,
        dataset,
        y_pred,
        score,
    })
}
