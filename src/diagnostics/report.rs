use crate::diagnostics::TimingBreakdown;
use crate::integration::{IntegrationParams, Termination};
use serde::Serialize;

/// Summary of one integration run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationReport {
    pub input: InputDescriptor,
    pub params: IntegrationParams,
    pub solver: SolverStage,
    pub timings: TimingBreakdown,
}

/// Shape of the problem handed to the solver.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub valid_pixels: usize,
    /// "orthographic" or "perspective".
    pub projection: &'static str,
    /// Pixels constrained by the depth prior; `None` without a prior.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_pixels: Option<usize>,
    /// Connected pixel pairs per difference operator, `[u+, u-, v+, v-]`.
    pub edges: [usize; 4],
}

/// Outer-loop outcome and energy history.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverStage {
    pub termination: Termination,
    pub initial_energy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_energy: Option<f64>,
    pub energy_trace: Vec<f64>,
    pub cg_iterations: usize,
    /// Outer iterations whose inner CG solve hit `cg_max_iter`.
    pub cg_capped: usize,
}

impl IntegrationReport {
    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        let status = if self.solver.termination.converged() {
            "converged"
        } else {
            "exhausted"
        };
        format!(
            "{}x{} ({} valid, {}) {} after {} iterations, energy {:.3e} -> {}, {:.1} ms",
            self.input.width,
            self.input.height,
            self.input.valid_pixels,
            self.input.projection,
            status,
            self.solver.termination.iterations(),
            self.solver.initial_energy,
            self.solver
                .final_energy
                .map(|e| format!("{e:.3e}"))
                .unwrap_or_else(|| "-".to_string()),
            self.timings.total_ms,
        )
    }
}
