//! Bilateral normal integration.
//!
//! The pipeline runs, for every call:
//!
//! 1. [`indexing`]: dense row-major index over the valid pixels;
//! 2. [`operators`]: four one-sided difference operators respecting the mask;
//! 3. [`coefficients`]: camera-dependent coupling of normals to derivatives;
//! 4. [`system`]: stacked system `A z ≈ b`;
//! 5. [`irls`]: bilateral IRLS with an inner CG solve ([`cg`]), optionally
//!    anchored by a depth prior ([`prior`]);
//! 6. `geometry`: depth map, vertices, quads and weight maps.
//!
//! Nothing is cached across calls, so one [`NormalIntegrator`] can be shared
//! between threads.
//!
//! ```no_run
//! use bini::image::{Mask, NormalMap};
//! use bini::{IntegrationParams, NormalIntegrator, Projection};
//!
//! # fn example(normals: NormalMap, mask: Mask) -> bini::Result<()> {
//! let projection = Projection::perspective(nalgebra::Matrix3::new(
//!     500.0, 0.0, 240.0, 0.0, 500.0, 320.0, 0.0, 0.0, 1.0,
//! ))?;
//! let integrator = NormalIntegrator::new(IntegrationParams::default().with_k(2.0));
//! let out = integrator.run_with_progress(&normals, &mask, &projection, None, &mut |it| {
//!     println!("iter {} energy {:.4e}", it.iteration + 1, it.energy);
//! })?;
//! println!("{}", out.report.summary());
//! # Ok(())
//! # }
//! ```

pub mod camera;
pub mod cg;
pub mod coefficients;
mod geometry;
pub mod indexing;
pub mod irls;
pub(crate) mod linalg;
pub mod operators;
pub mod params;
pub mod prior;
pub mod system;

pub use camera::{Intrinsics, Projection};
pub use cg::{CgOutcome, ConjugateGradient, LinearOperator, SolveControl, SpdSolver};
pub use irls::Termination;
pub use params::{IntegrationParams, Preconditioner};
pub use prior::DepthPrior;

use crate::diagnostics::{
    InputDescriptor, IntegrationReport, IterationReport, SolverStage, TimingBreakdown,
};
use crate::error::{IntegrationError, Result};
use crate::image::{ImageF64, ImageView, Mask, NormalMap};
use crate::mesh::Mesh;
use coefficients::CoefficientField;
use indexing::PixelIndex;
use irls::BilateralIrls;
use log::{debug, info, warn};
use operators::DifferenceOperators;
use prior::PriorField;
use std::time::Instant;
use system::StackedSystem;

/// Everything produced by one integration run.
#[derive(Clone, Debug)]
pub struct IntegrationOutput {
    /// Depth per pixel, `NaN` outside the mask.
    pub depth_map: ImageF64,
    pub mesh: Mesh,
    /// Final forward weights of the `v` axis, `NaN` outside the mask.
    pub wu_map: ImageF64,
    /// Final forward weights of the `u` axis, `NaN` outside the mask.
    pub wv_map: ImageF64,
    /// Energy after each outer iteration.
    pub energy_trace: Vec<f64>,
    pub termination: Termination,
    pub report: IntegrationReport,
}

/// Reusable integrator holding the hyperparameters.
#[derive(Clone, Debug, Default)]
pub struct NormalIntegrator {
    params: IntegrationParams,
}

impl NormalIntegrator {
    pub fn new(params: IntegrationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &IntegrationParams {
        &self.params
    }

    /// Integrate `normals` over `mask`, logging each outer iteration at
    /// `debug` level.
    pub fn run(
        &self,
        normals: &NormalMap,
        mask: &Mask,
        projection: &Projection,
        prior: Option<&DepthPrior>,
    ) -> Result<IntegrationOutput> {
        self.run_with_progress(normals, mask, projection, prior, &mut log_iteration)
    }

    /// Like [`run`](Self::run), invoking `progress` once per outer iteration.
    pub fn run_with_progress(
        &self,
        normals: &NormalMap,
        mask: &Mask,
        projection: &Projection,
        prior: Option<&DepthPrior>,
        progress: &mut dyn FnMut(&IterationReport),
    ) -> Result<IntegrationOutput> {
        self.params.validate()?;
        check_shapes(normals, mask, prior)?;

        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();
        let params = &self.params;
        let (w, h) = mask.dims();
        debug!(
            "NormalIntegrator::run start w={} h={} projection={} prior={}",
            w,
            h,
            projection.name(),
            prior.is_some()
        );

        let stage = Instant::now();
        let index = PixelIndex::build(mask)?;
        let prior_field = prior
            .map(|p| PriorField::build(p, &index, projection))
            .transpose()?;
        timings.record("index", stage);
        debug!("valid pixels: {}", index.len());

        let stage = Instant::now();
        let ops = DifferenceOperators::build(&index, params.step_size);
        let coeffs = CoefficientField::build(normals, &index, projection);
        let system = StackedSystem::assemble(&ops, &coeffs);
        timings.record("assemble", stage);
        let edges = ops.edge_counts();
        debug!(
            "stacked system: {}x{} nnz={} edges u+={} u-={} v+={} v-={}",
            system.a.rows(),
            system.a.cols(),
            system.a.nnz(),
            edges[0],
            edges[1],
            edges[2],
            edges[3]
        );

        let stage = Instant::now();
        let outcome = BilateralIrls {
            system: &system,
            params,
            prior: prior_field.as_ref(),
            solver: ConjugateGradient::new(params.preconditioner),
        }
        .run(progress);
        timings.record("irls", stage);
        if outcome.cg_capped > 0 {
            warn!(
                "CG stopped at cg_max_iter={} before cg_tol={:.1e} in {} of {} outer iterations",
                params.cg_max_iter,
                params.cg_tol,
                outcome.cg_capped,
                outcome.energy_trace.len()
            );
        }

        let stage = Instant::now();
        let depth = geometry::depth_values(&outcome.z, projection);
        let depth_map = geometry::depth_map(&index, &depth);
        let flip = geometry::flip_winding(normals);
        let mesh = geometry::build_mesh(&index, &depth, projection, params.step_size, flip);
        let (wu_map, wv_map) = geometry::weight_maps(&index, &outcome.weights);
        timings.record("geometry", stage);
        timings.finish(total_start);

        let report = IntegrationReport {
            input: InputDescriptor {
                width: w,
                height: h,
                valid_pixels: index.len(),
                projection: projection.name(),
                prior_pixels: prior_field.as_ref().map(PriorField::active_count),
                edges,
            },
            params: params.clone(),
            solver: SolverStage {
                termination: outcome.termination,
                initial_energy: outcome.initial_energy,
                final_energy: outcome.energy_trace.last().copied(),
                energy_trace: outcome.energy_trace.clone(),
                cg_iterations: outcome.cg_iterations,
                cg_capped: outcome.cg_capped,
            },
            timings,
        };
        info!("{}", report.summary());

        Ok(IntegrationOutput {
            depth_map,
            mesh,
            wu_map,
            wv_map,
            energy_trace: outcome.energy_trace,
            termination: outcome.termination,
            report,
        })
    }
}

/// Integrate with the given parameters; see [`NormalIntegrator::run`].
pub fn integrate(
    normals: &NormalMap,
    mask: &Mask,
    projection: &Projection,
    prior: Option<&DepthPrior>,
    params: &IntegrationParams,
) -> Result<IntegrationOutput> {
    NormalIntegrator::new(params.clone()).run(normals, mask, projection, prior)
}

/// Integrate with a per-iteration progress callback.
pub fn integrate_with_progress(
    normals: &NormalMap,
    mask: &Mask,
    projection: &Projection,
    prior: Option<&DepthPrior>,
    params: &IntegrationParams,
    progress: &mut dyn FnMut(&IterationReport),
) -> Result<IntegrationOutput> {
    NormalIntegrator::new(params.clone()).run_with_progress(
        normals, mask, projection, prior, progress,
    )
}

fn log_iteration(it: &IterationReport) {
    debug!(
        "iter {}/{} energy={:.6e} rel={:.3e} cg_iters={} cg_rel_res={:.2e}",
        it.iteration + 1,
        it.max_iter,
        it.energy,
        it.relative_energy,
        it.cg.iterations,
        it.cg.relative_residual
    );
}

fn check_shapes(normals: &NormalMap, mask: &Mask, prior: Option<&DepthPrior>) -> Result<()> {
    if !normals.same_shape(mask) {
        return Err(IntegrationError::invalid(format!(
            "normal map is {}x{} but mask is {}x{}",
            normals.w, normals.h, mask.w, mask.h
        )));
    }
    if let Some(prior) = prior {
        if !(prior.depth.same_shape(mask) && prior.mask.same_shape(mask)) {
            return Err(IntegrationError::invalid(format!(
                "depth prior is {}x{} (mask {}x{}) but the integration mask is {}x{}",
                prior.depth.w, prior.depth.h, prior.mask.w, prior.mask.h, mask.w, mask.h
            )));
        }
    }
    Ok(())
}
