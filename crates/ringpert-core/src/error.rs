//! Study-level errors.
//!
//! Component errors ([`SolverError`], [`HarmonicError`], ...) convert into
//! [`StudyError`] with `?`. Whether an error is fatal depends on where it
//! happens: anything during the baseline run aborts the study, while a sweep
//! records the failing point and carries on.

use ringpert_compute::ComputeError;
use ringpert_geometry::{GeometryError, RingGeometry};
use thiserror::Error;

use crate::harminv::HarmonicError;
use crate::report::ReportError;
use crate::solver::SolverError;
use crate::types::ExcitationBand;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("No resonance found in band ({band}) for {geometry}")]
    NoResonanceFound {
        band: ExcitationBand,
        geometry: Box<RingGeometry>,
    },

    #[error("Degenerate comparison: {0}")]
    DegenerateComparison(String),

    #[error("Inconsistent sweep state at index {index}: {detail}")]
    InconsistentSweepState { index: usize, detail: String },

    #[error("Sweep job panicked: {0}")]
    JobPanicked(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Harmonic inversion error: {0}")]
    Harmonic(#[from] HarmonicError),

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}
