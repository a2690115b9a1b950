//! Conjugate-gradient solve for symmetric positive (semi-)definite systems.
//!
//! The solver only sees the system through [`LinearOperator`], so the CSR
//! matrices assembled by the integrator can be swapped for any other
//! representation, and [`SpdSolver`] lets callers plug in a different solver.
use super::linalg::{collect_indexed, diagonal, dot, spmv};
use super::params::Preconditioner;
use serde::Serialize;
use sprs::CsMat;

/// Square linear map `x ↦ M x`.
pub trait LinearOperator: Sync {
    fn dim(&self) -> usize;

    fn matvec(&self, x: &[f64]) -> Vec<f64>;

    /// Diagonal of `M`, if cheaply available (used for Jacobi scaling).
    fn diagonal(&self) -> Option<Vec<f64>> {
        None
    }
}

impl LinearOperator for CsMat<f64> {
    fn dim(&self) -> usize {
        self.rows()
    }

    fn matvec(&self, x: &[f64]) -> Vec<f64> {
        spmv(self, x)
    }

    fn diagonal(&self) -> Option<Vec<f64>> {
        Some(diagonal(self))
    }
}

/// Iteration cap and relative tolerance of one solve.
#[derive(Clone, Copy, Debug)]
pub struct SolveControl {
    pub max_iter: usize,
    /// Stop once `‖rhs - M x‖ <= tol · ‖rhs‖`.
    pub tol: f64,
}

/// Outcome of one solve. Stopping at the iteration cap is not an error; the
/// last iterate is kept.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CgOutcome {
    pub iterations: usize,
    /// Final residual norm relative to `‖rhs‖` (absolute when `rhs = 0`).
    pub relative_residual: f64,
    pub converged: bool,
}

/// Solver for `M x = rhs`, warm-started from the contents of `x`.
pub trait SpdSolver {
    fn solve(
        &self,
        op: &dyn LinearOperator,
        rhs: &[f64],
        x: &mut [f64],
        control: SolveControl,
    ) -> CgOutcome;
}

/// Conjugate gradient, optionally with a Jacobi preconditioner.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConjugateGradient {
    pub preconditioner: Preconditioner,
}

impl ConjugateGradient {
    pub fn new(preconditioner: Preconditioner) -> Self {
        Self { preconditioner }
    }
}

/// Pivots below this are treated as empty rows by the Jacobi scaling.
const DIAG_EPS: f64 = 1e-300;

impl SpdSolver for ConjugateGradient {
    fn solve(
        &self,
        op: &dyn LinearOperator,
        rhs: &[f64],
        x: &mut [f64],
        control: SolveControl,
    ) -> CgOutcome {
        let n = op.dim();
        debug_assert_eq!(rhs.len(), n);
        debug_assert_eq!(x.len(), n);

        let inv_diag: Option<Vec<f64>> = match self.preconditioner {
            Preconditioner::None => None,
            Preconditioner::Jacobi => op.diagonal().map(|d| {
                d.into_iter()
                    .map(|v| if v.abs() > DIAG_EPS { 1.0 / v } else { 1.0 })
                    .collect()
            }),
        };
        let precondition = |r: &[f64]| -> Vec<f64> {
            match &inv_diag {
                Some(inv) => collect_indexed(n, |i| inv[i] * r[i]),
                None => r.to_vec(),
            }
        };

        let rhs_norm = dot(rhs, rhs).sqrt();
        let scale = if rhs_norm > 0.0 { rhs_norm } else { 1.0 };
        let threshold = control.tol * rhs_norm;

        let mx = op.matvec(x);
        let mut r: Vec<f64> = collect_indexed(n, |i| rhs[i] - mx[i]);
        let mut r_norm = dot(&r, &r).sqrt();
        if r_norm <= threshold {
            return CgOutcome {
                iterations: 0,
                relative_residual: r_norm / scale,
                converged: true,
            };
        }

        let mut zr = precondition(&r);
        let mut p = zr.clone();
        let mut rz = dot(&r, &zr);
        let mut iterations = 0;
        while iterations < control.max_iter {
            let mp = op.matvec(&p);
            let curvature = dot(&p, &mp);
            if !(curvature > 0.0) {
                // Direction in the null space (or numerical breakdown).
                break;
            }
            let alpha = rz / curvature;
            for i in 0..n {
                x[i] += alpha * p[i];
                r[i] -= alpha * mp[i];
            }
            iterations += 1;
            r_norm = dot(&r, &r).sqrt();
            if r_norm <= threshold {
                break;
            }
            zr = precondition(&r);
            let rz_next = dot(&r, &zr);
            let beta = rz_next / rz;
            rz = rz_next;
            for i in 0..n {
                p[i] = zr[i] + beta * p[i];
            }
        }

        CgOutcome {
            iterations,
            relative_residual: r_norm / scale,
            converged: r_norm <= threshold,
        }
    }
}
