//! Parameters controlling the bilateral IRLS integration.

use crate::error::{IntegrationError, Result};
use serde::{Deserialize, Serialize};

/// Preconditioner applied inside the conjugate-gradient solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preconditioner {
    /// Plain CG.
    #[default]
    None,
    /// Diagonal (Jacobi) scaling of the normal equations.
    Jacobi,
}

/// Hyperparameters of the reconstruction.
///
/// Defaults: `k = 2`, 100 outer iterations,
/// CG capped at 500 steps.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationParams {
    /// Sharpness of the bilateral sigmoid. `0` keeps both one-sided
    /// estimators equally weighted (plain least squares).
    pub k: f64,
    /// Weight of the depth-prior term. Ignored without a prior.
    pub lambda1: f64,
    /// Physical spacing between adjacent pixels.
    pub step_size: f64,
    /// Maximum number of outer IRLS iterations.
    pub max_iter: usize,
    /// Relative-energy threshold that ends the outer loop.
    pub tol: f64,
    /// Maximum number of CG iterations per outer iteration.
    pub cg_max_iter: usize,
    /// CG stopping threshold relative to the right-hand-side norm.
    pub cg_tol: f64,
    pub preconditioner: Preconditioner,
}

impl Default for IntegrationParams {
    fn default() -> Self {
        Self {
            k: 2.0,
            lambda1: 0.0,
            step_size: 1.0,
            max_iter: 100,
            tol: 1e-4,
            cg_max_iter: 500,
            cg_tol: 1e-5,
            preconditioner: Preconditioner::None,
        }
    }
}

impl IntegrationParams {
    pub fn with_k(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    pub fn with_lambda1(mut self, lambda1: f64) -> Self {
        self.lambda1 = lambda1;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Reject values the solver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(IntegrationError::invalid(format!(
                "step_size must be positive and finite, got {}",
                self.step_size
            )));
        }
        if !(self.k.is_finite() && self.k >= 0.0) {
            return Err(IntegrationError::invalid(format!(
                "k must be non-negative and finite, got {}",
                self.k
            )));
        }
        if !(self.lambda1.is_finite() && self.lambda1 >= 0.0) {
            return Err(IntegrationError::invalid(format!(
                "lambda1 must be non-negative and finite, got {}",
                self.lambda1
            )));
        }
        for (name, value) in [("tol", self.tol), ("cg_tol", self.cg_tol)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(IntegrationError::invalid(format!(
                    "{name} must be non-negative and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}
