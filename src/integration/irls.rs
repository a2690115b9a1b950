//! Bilateral IRLS: alternate a weighted least-squares solve with a soft
//! selection between the forward and backward estimator of each derivative.
//!
//! Per outer iteration:
//! 1. optional prior fusion: shift `z` by the mean prior residual;
//! 2. solve `(AᵀWA + λM) z = AᵀWb + λM z_prior` by CG, warm-started at `z`;
//! 3. reweight: `w+ = sigmoid((A- z)² - (A+ z)², k)`, `w- = 1 - w+`, per axis;
//! 4. recompute the energy and stop once its relative change drops below `tol`.
//!
//! The loop is strictly sequential; the kernels inside each step are not.
use super::cg::{SolveControl, SpdSolver};
use super::linalg::collect_indexed;
use super::params::IntegrationParams;
use super::prior::PriorField;
use super::system::{Block, PriorTerm, StackedSystem};
use crate::diagnostics::IterationReport;
use log::{debug, warn};
use serde::Serialize;

/// How the outer loop ended. Both variants carry a usable depth estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Termination {
    /// Relative energy fell below `tol` after `iterations` outer iterations.
    Converged { iterations: usize },
    /// `max_iter` outer iterations ran without meeting `tol`.
    Exhausted { iterations: usize },
}

impl Termination {
    pub fn iterations(&self) -> usize {
        match *self {
            Self::Converged { iterations } | Self::Exhausted { iterations } => iterations,
        }
    }

    pub fn converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

#[inline]
pub fn sigmoid(x: f64, k: f64) -> f64 {
    1.0 / (1.0 + (-k * x).exp())
}

/// `|energy - previous| / previous`, with `0/0 = 0` and `x/0 = ∞`.
pub(crate) fn relative_change(energy: f64, previous: f64) -> f64 {
    let delta = (energy - previous).abs();
    if previous > 0.0 {
        delta / previous
    } else if delta == 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

/// Forward-estimator weights along one axis; backward weights are their
/// complement.
pub(crate) fn forward_weights(forward: &[f64], backward: &[f64], k: f64) -> Vec<f64> {
    collect_indexed(forward.len(), |i| {
        let f = forward[i];
        let b = backward[i];
        sigmoid(b * b - f * f, k)
    })
}

pub(crate) struct IrlsOutcome {
    pub z: Vec<f64>,
    /// Final stacked weights, block layout of [`StackedSystem`].
    pub weights: Vec<f64>,
    pub initial_energy: f64,
    pub energy_trace: Vec<f64>,
    pub termination: Termination,
    /// Sum of inner CG iterations over all outer iterations.
    pub cg_iterations: usize,
    /// Outer iterations whose CG solve stopped at `cg_max_iter`.
    pub cg_capped: usize,
}

pub(crate) struct BilateralIrls<'a, S: SpdSolver> {
    pub system: &'a StackedSystem,
    pub params: &'a IntegrationParams,
    pub prior: Option<&'a PriorField>,
    pub solver: S,
}

impl<S: SpdSolver> BilateralIrls<'_, S> {
    pub fn run(&self, progress: &mut dyn FnMut(&IterationReport)) -> IrlsOutcome {
        let n = self.system.dim();
        let params = self.params;
        let mut z = vec![0.0; n];
        let mut weights = vec![0.5; 4 * n];
        let initial_energy = self.system.energy(&z, &weights);
        let mut energy = initial_energy;
        let mut energy_trace = Vec::with_capacity(params.max_iter.min(1024));
        let mut cg_iterations = 0usize;
        let mut cg_capped = 0usize;
        let control = SolveControl {
            max_iter: params.cg_max_iter,
            tol: params.cg_tol,
        };

        for iteration in 0..params.max_iter {
            let mut prior_offset = None;
            let prior_term = self.prior.map(|prior| {
                match prior.offset(&z) {
                    Some(offset) => {
                        z.iter_mut().for_each(|zi| *zi += offset);
                        prior_offset = Some(offset);
                    }
                    None => warn!("prior fusion: no usable residual, offset left at 0"),
                }
                PriorTerm {
                    lambda: params.lambda1,
                    mask: &prior.mask,
                    target: &prior.target,
                }
            });

            let (m, rhs) = self.system.normal_equations(&weights, prior_term);
            let cg = self.solver.solve(&m, &rhs, &mut z, control);
            cg_iterations += cg.iterations;
            if !cg.converged {
                cg_capped += 1;
                debug!(
                    "IRLS step {}: CG stopped after {} iterations at relative residual {:.3e}",
                    iteration + 1,
                    cg.iterations,
                    cg.relative_residual
                );
            }

            weights = self.reweight(&z);

            let previous = energy;
            energy = self.system.energy(&z, &weights);
            energy_trace.push(energy);
            let relative_energy = relative_change(energy, previous);
            progress(&IterationReport {
                iteration,
                max_iter: params.max_iter,
                energy,
                relative_energy,
                cg,
                prior_offset,
            });

            if relative_energy < params.tol {
                return IrlsOutcome {
                    z,
                    weights,
                    initial_energy,
                    energy_trace,
                    termination: Termination::Converged {
                        iterations: iteration + 1,
                    },
                    cg_iterations,
                    cg_capped,
                };
            }
        }

        if params.max_iter > 0 {
            warn!(
                "IRLS did not reach tol={:.1e} within {} iterations (last energy {:.6e})",
                params.tol, params.max_iter, energy
            );
        }
        IrlsOutcome {
            z,
            weights,
            initial_energy,
            energy_trace,
            termination: Termination::Exhausted {
                iterations: params.max_iter,
            },
            cg_iterations,
            cg_capped,
        }
    }

    /// Recompute the stacked weights from the current estimate.
    fn reweight(&self, z: &[f64]) -> Vec<f64> {
        let n = self.system.dim();
        let az = self.system.apply(z);
        let k = self.params.k;
        let wu = forward_weights(
            &az[Block::UForward.range(n)],
            &az[Block::UBackward.range(n)],
            k,
        );
        let wv = forward_weights(
            &az[Block::VForward.range(n)],
            &az[Block::VBackward.range(n)],
            k,
        );
        let mut weights = Vec::with_capacity(4 * n);
        weights.extend_from_slice(&wu);
        weights.extend(wu.iter().map(|w| 1.0 - w));
        weights.extend_from_slice(&wv);
        weights.extend(wv.iter().map(|w| 1.0 - w));
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Mask, NormalMap};
    use crate::integration::camera::Projection;
    use crate::integration::cg::ConjugateGradient;
    use crate::integration::coefficients::CoefficientField;
    use crate::integration::indexing::PixelIndex;
    use crate::integration::operators::DifferenceOperators;

    fn bumpy_system() -> StackedSystem {
        let (w, h) = (9usize, 7usize);
        let mask = Mask::from_fn(w, h, |x, y| !(x == 4 && y == 3));
        let normals = NormalMap::from_fn(w, h, |x, y| {
            // Crease along x = 4 so forward and backward estimates disagree.
            let sx = if x < 4 { 0.4 } else { -0.3 };
            let n = [sx, 0.1 * (y as f64 - 3.0), 1.0];
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            n.map(|c| c / len)
        });
        let index = PixelIndex::build(&mask).unwrap();
        let ops = DifferenceOperators::build(&index, 1.0);
        let coeffs = CoefficientField::build(&normals, &index, &Projection::Orthographic);
        StackedSystem::assemble(&ops, &coeffs)
    }

    #[test]
    fn sigmoid_is_bounded_and_saturates() {
        assert_eq!(sigmoid(0.0, 2.0), 0.5);
        assert_eq!(sigmoid(1e6, 2.0), 1.0);
        assert_eq!(sigmoid(-1e6, 2.0), 0.0);
        assert!(sigmoid(0.3, 2.0) > 0.5);
    }

    #[test]
    fn relative_change_handles_zero_energy() {
        assert_eq!(relative_change(0.0, 0.0), 0.0);
        assert_eq!(relative_change(1.0, 0.0), f64::INFINITY);
        assert_eq!(relative_change(1.5, 2.0), 0.25);
    }

    #[test]
    fn weights_stay_complementary_and_energy_non_negative() {
        let system = bumpy_system();
        let params = IntegrationParams::default().with_max_iter(15).with_tol(0.0);
        let irls = BilateralIrls {
            system: &system,
            params: &params,
            prior: None,
            solver: ConjugateGradient::default(),
        };
        let mut reports = Vec::new();
        let out = irls.run(&mut |r: &IterationReport| reports.push(*r));
        assert_eq!(reports.len(), 15);
        assert_eq!(out.energy_trace.len(), 15);
        assert_eq!(out.termination, Termination::Exhausted { iterations: 15 });
        assert!(out.energy_trace.iter().all(|&e| e >= 0.0));
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.iteration, i);
            assert_eq!(report.energy, out.energy_trace[i]);
        }

        let n = system.dim();
        for (fwd, bwd) in [
            (Block::UForward, Block::UBackward),
            (Block::VForward, Block::VBackward),
        ] {
            let wf = &out.weights[fwd.range(n)];
            let wb = &out.weights[bwd.range(n)];
            for (a, b) in wf.iter().zip(wb) {
                assert!((0.0..=1.0).contains(a) && (0.0..=1.0).contains(b));
                assert!((a + b - 1.0).abs() <= f64::EPSILON);
            }
        }
    }

    #[test]
    fn reweight_prefers_the_smaller_one_sided_derivative() {
        let wf = forward_weights(&[3.0, 0.1, 1.0], &[0.1, 3.0, 1.0], 2.0);
        assert!(wf[0] < 0.01, "large forward jump should lose weight");
        assert!(wf[1] > 0.99, "large backward jump favours the forward side");
        assert_eq!(wf[2], 0.5);
    }

    #[test]
    fn zero_iterations_report_exhaustion_with_zero_depth() {
        let system = bumpy_system();
        let params = IntegrationParams::default().with_max_iter(0);
        let irls = BilateralIrls {
            system: &system,
            params: &params,
            prior: None,
            solver: ConjugateGradient::default(),
        };
        let out = irls.run(&mut |_| {});
        assert_eq!(out.termination, Termination::Exhausted { iterations: 0 });
        assert!(out.z.iter().all(|&v| v == 0.0));
        assert!(out.weights.iter().all(|&w| w == 0.5));
        assert!(out.energy_trace.is_empty());
    }
}
