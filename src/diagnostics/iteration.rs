use crate::integration::cg::CgOutcome;
use serde::Serialize;

/// Snapshot handed to the progress callback after every outer iteration.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationReport {
    /// Zero-based outer iteration index.
    pub iteration: usize,
    pub max_iter: usize,
    /// `(Az - b)ᵀ W (Az - b)` after the weight update.
    pub energy: f64,
    /// `|energy - previous| / previous`.
    pub relative_energy: f64,
    /// Inner solve outcome; `converged == false` flags a best-effort iterate.
    pub cg: CgOutcome,
    /// Global shift applied from the depth prior, if one was fused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_offset: Option<f64>,
}
