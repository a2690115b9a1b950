#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod integration;
pub mod mesh;

// --- High-level re-exports -------------------------------------------------

// Main entry points: integrator + results.
pub use crate::error::{IntegrationError, Result};
pub use crate::integration::{
    integrate, integrate_with_progress, DepthPrior, IntegrationOutput, IntegrationParams,
    Intrinsics, NormalIntegrator, Projection, Termination,
};

// High-level diagnostics returned by the integrator.
pub use crate::diagnostics::{IntegrationReport, IterationReport};

// Mesh topology produced from the reconstructed depth.
pub use crate::mesh::Mesh;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use bini::prelude::*;
///
/// # fn main() -> bini::Result<()> {
/// let (w, h) = (64usize, 48usize);
/// let normals = NormalMap::filled(w, h, [0.0, 0.0, 1.0]);
/// let mask = Mask::full(w, h);
///
/// let integrator = NormalIntegrator::new(IntegrationParams::default());
/// let out = integrator.run(&normals, &mask, &Projection::Orthographic, None)?;
/// println!("quads={} iterations={}", out.mesh.facets.len(), out.energy_trace.len());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{ImageF64, Mask, NormalMap};
    pub use crate::{IntegrationParams, NormalIntegrator, Projection};
}
