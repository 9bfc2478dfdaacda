//! Read/write fitted-model JSON files.
//!
//! Model JSON is the portable representation of one path point:
//! - family, `eta`, penalty settings and the coefficients
//! - `ynull`, so pseudo-R² can be computed against the training null model
//! - the feature names (in coefficient order) used to align prediction inputs
//!
//! When features were standardized before fitting, the scaler is stored alongside
//! so raw inputs can be transformed the same way at prediction time.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::data::Standardizer;
use crate::domain::{Family, ScoreMetric};
use crate::error::AppError;
use crate::fit::FittedGlm;

/// Stored per-column standardization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerFile {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// On-disk schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub family: Family,
    pub eta: f64,
    pub alpha: f64,
    pub reg_lambda: f64,
    pub beta0: f64,
    pub beta: Vec<f64>,
    pub ynull: f64,
    pub score_metric: ScoreMetric,
    pub n_iter: usize,
    pub converged: bool,
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<ScalerFile>,
}

impl ModelFile {
    pub fn from_fit(model: &FittedGlm, feature_names: Vec<String>, scaler: Option<&Standardizer>) -> Self {
        Self {
            tool: "glm".to_string(),
            created_at: Utc::now(),
            family: model.family,
            eta: model.eta,
            alpha: model.alpha,
            reg_lambda: model.reg_lambda,
            beta0: model.beta0,
            beta: model.beta.iter().copied().collect(),
            ynull: model.ynull,
            score_metric: model.score_metric,
            n_iter: model.n_iter,
            converged: model.converged,
            feature_names,
            scaler: scaler.map(|s| ScalerFile {
                mean: s.mean.iter().copied().collect(),
                scale: s.scale.iter().copied().collect(),
            }),
        }
    }

    pub fn to_fit(&self) -> FittedGlm {
        FittedGlm {
            family: self.family,
            eta: self.eta,
            alpha: self.alpha,
            reg_lambda: self.reg_lambda,
            beta0: self.beta0,
            beta: DVector::from_vec(self.beta.clone()),
            ynull: self.ynull,
            score_metric: self.score_metric,
            n_iter: self.n_iter,
            converged: self.converged,
        }
    }

    pub fn standardizer(&self) -> Option<Standardizer> {
        self.scaler.as_ref().map(|s| Standardizer {
            mean: DVector::from_vec(s.mean.clone()),
            scale: DVector::from_vec(s.scale.clone()),
        })
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.feature_names.len() != self.beta.len() {
            return Err(AppError::new(
                2,
                format!(
                    "Invalid model JSON: {} feature names for {} coefficients.",
                    self.feature_names.len(),
                    self.beta.len()
                ),
            ));
        }
        if let Some(s) = &self.scaler {
            if s.mean.len() != self.beta.len() || s.scale.len() != self.beta.len() {
                return Err(AppError::new(2, "Invalid model JSON: scaler length mismatch."));
            }
        }
        Ok(())
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, model: &ModelFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, model)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read and validate a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: ModelFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid model JSON: {e}")))?;
    model.validate()?;
    Ok(model)
}
