//! Diagnostics returned alongside the reconstruction.
//!
//! [`IntegrationReport`] is the serializable summary of a run: input shape,
//! projection, how the outer loop ended and where the time went.
//! [`IterationReport`] is the per-iteration snapshot handed to progress
//! callbacks while the solver is still running.

pub mod iteration;
pub mod report;
pub mod timing;

pub use iteration::IterationReport;
pub use report::{InputDescriptor, IntegrationReport, SolverStage};
pub use timing::{StageTiming, TimingBreakdown};
