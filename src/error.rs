//! Error types.
//!
//! Two layers:
//!
//! - [`GlmError`]: typed failures raised by the estimator, metrics and data helpers.
//! - [`AppError`]: what the `glm` binary reports, carrying a process exit code.
//!
//! Exit codes used by the binary:
//! - `2`: usage / IO problems (bad flags, unreadable files)
//! - `3`: no usable data
//! - `4`: numerical failure (divergence, degenerate scores)

use thiserror::Error;

/// Failures raised by the numerical core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GlmError {
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("solver diverged at reg_lambda={reg_lambda} (iteration {iteration})")]
    Diverged { reg_lambda: f64, iteration: usize },

    #[error("{operation} is not supported for the {family} family")]
    UnsupportedForFamily {
        operation: &'static str,
        family: &'static str,
    },
}

impl GlmError {
    pub(crate) fn shape(what: &'static str, expected: usize, found: usize) -> Self {
        GlmError::ShapeMismatch {
            what,
            expected,
            found,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<GlmError> for AppError {
    fn from(err: GlmError) -> Self {
        let exit_code = match err {
            GlmError::InvalidParameter(_) | GlmError::UnsupportedForFamily { .. } => 2,
            GlmError::ShapeMismatch { .. } | GlmError::InvalidTarget(_) => 3,
            GlmError::Diverged { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
