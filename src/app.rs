//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - runs the requested pipeline
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{Cli, Command, DemoArgs, EstimatorArgs, FitArgs, LinkArgs, PredictArgs};
use crate::domain::{DemoConfig, EstimatorConfig, FitConfig, PredictConfig};
use crate::error::AppError;
use crate::report;

pub mod pipeline;

/// Entry point for the `glm` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine; flags and the process environment still apply.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Link(args) => handle_link(args),
        Command::Demo(args) => handle_demo(args),
        Command::Fit(args) => handle_fit(args),
        Command::Predict(args) => handle_predict(args),
    }
}

fn handle_link(args: LinkArgs) -> Result<(), AppError> {
    if args.steps < 2 || !(args.z_max > args.z_min) {
        return Err(AppError::new(
            2,
            "Link table needs --steps >= 2 and --z-max > --z-min.",
        ));
    }
    let points = crate::math::link_curve(args.eta, args.z_min, args.z_max, args.steps);
    println!("{}", report::format_link_table(&points, args.eta));
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = demo_config_from_args(&args);
    let run = pipeline::run_demo(&config)?;

    println!("{}", report::format_link_table(&run.link, config.estimator.eta));
    println!(
        "{}",
        report::format_path_summary(
            &run.path_rows,
            config.estimator.score_metric,
            run.path.len() - 1
        )
    );
    println!("{}", report::format_prediction_table(&run.y_test, &run.y_pred, config.show));
    println!(
        "{}",
        report::format_demo_summary(
            run.selected(),
            run.beta_true.iter().filter(|&&b| b != 0.0).count(),
            run.train_score,
            run.test_score,
            run.correlation,
        )
    );

    if let Some(path) = &config.export_model {
        let names: Vec<String> = (0..config.n_features).map(|j| format!("x{j}")).collect();
        let file = crate::io::ModelFile::from_fit(run.selected(), names, Some(&run.scaler));
        crate::io::write_model_json(path, &file)?;
    }
    if let Some(path) = &config.export_predictions {
        crate::io::write_predictions_csv(path, Some(&run.y_test), &run.y_pred)?;
    }
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(&args);
    let run = pipeline::run_fit(&config)?;

    if !run.dataset.row_errors.is_empty() {
        println!(
            "Skipped {} of {} rows (first: line {}: {}).",
            run.dataset.row_errors.len(),
            run.dataset.rows_read,
            run.dataset.row_errors[0].line,
            run.dataset.row_errors[0].message
        );
    }
    println!(
        "{}",
        report::format_path_summary(
            &run.path_rows,
            config.estimator.score_metric,
            run.selected_index
        )
    );
    if let Some(cv) = &run.cv {
        println!("{}", report::format_cv_summary(cv, config.estimator.score_metric));
    }
    println!(
        "{}",
        report::format_coefficients(run.selected(), &run.dataset.feature_names, 25)
    );

    if let Some(path) = &config.export_model {
        crate::io::write_model_json(path, &run.model_file())?;
    }
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let config = predict_config_from_args(&args);
    let run = pipeline::run_predict(&config)?;

    match &run.dataset.y {
        Some(y) => println!("{}", report::format_prediction_table(y, &run.y_pred, 20)),
        None => {
            for (i, p) in run.y_pred.iter().take(20).enumerate() {
                println!("{i:>6} {p:>12.3}");
            }
        }
    }
    if let Some(score) = run.score {
        println!("{}: {score:.6}", run.model.score_metric.display_name());
    }

    if let Some(path) = &config.output {
        crate::io::write_predictions_csv(path, run.dataset.y.as_ref(), &run.y_pred)?;
    }
    Ok(())
}

pub fn estimator_config_from_args(args: &EstimatorArgs) -> EstimatorConfig {
    EstimatorConfig {
        family: args.family,
        alpha: args.alpha,
        lambda_max: args.lambda_max,
        lambda_min: args.lambda_min,
        n_lambdas: args.n_lambdas,
        learning_rate: args.learning_rate,
        max_iter: args.max_iter,
        tol: args.tol,
        eta: args.eta,
        score_metric: args.score_metric,
        solver: args.solver,
        fit_intercept: !args.no_intercept,
        seed: args.seed,
    }
}

pub fn demo_config_from_args(args: &DemoArgs) -> DemoConfig {
    DemoConfig {
        estimator: estimator_config_from_args(&args.estimator),
        n_samples: args.n_samples,
        n_features: args.n_features,
        density: args.density,
        show: args.show,
        export_model: args.export_model.clone(),
        export_predictions: args.export_predictions.clone(),
    }
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        estimator: estimator_config_from_args(&args.estimator),
        input: args.input.clone(),
        target: args.target.clone(),
        cv_folds: args.cv_folds,
        standardize: !args.no_standardize,
        export_model: args.export_model.clone(),
    }
}

pub fn predict_config_from_args(args: &PredictArgs) -> PredictConfig {
    PredictConfig {
        model: args.model.clone(),
        input: args.input.clone(),
        target: args.target.clone(),
        output: args.output.clone(),
    }
}
