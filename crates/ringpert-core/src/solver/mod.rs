//! Field solver abstraction and implementations.
//!
//! The [`FieldSolver`] trait is the seam between the study and the numerical
//! method that produces fields. A run takes a geometry, its configuration and
//! an excitation, time-steps until the sources have switched off plus a
//! requested ring-down time, and returns a [`SimulationHandle`] that owns the
//! final field state.
//!
//! Two implementations are provided:
//!
//! - [`fdtd::CylindricalFdtd`]: finite-difference time-domain on a radial
//!   grid with an analytic $e^{im\phi}$ azimuthal dependence.
//! - [`surrogate::SurrogateSolver`]: a closed-form whispering-gallery model
//!   with a resolution-dependent bias, for fast deterministic studies.
//!
//! A handle's grid is never shared: every run allocates its own state and
//! dropping the handle releases it.

pub mod fdtd;
pub mod source;
pub mod surrogate;

use num_complex::Complex64;
use ringpert_geometry::{GeometryError, PolarPoint, Region, RingGeometry};
use thiserror::Error;

use crate::types::{Excitation, FieldComponent, Probe, SimulationConfig, TimeSeries};

/// Errors that can occur while running or querying a simulation.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Point r={radius:.4} lies outside the simulated cell (extent {extent:.4})")]
    OutsideDomain { radius: f64, extent: f64 },

    #[error("Simulation diverged at t={time:.3} (max |field| = {magnitude:.3e})")]
    Diverged { time: f64, magnitude: f64 },

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Everything a solver needs for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub geometry: &'a RingGeometry,
    pub config: &'a SimulationConfig,
    pub excitation: &'a Excitation,
    /// Time to keep stepping after the sources have switched off.
    pub run_time: f64,
    /// Component and point recorded during the ring-down, if any.
    pub probe: Option<Probe>,
}

impl RunRequest<'_> {
    /// Reject configurations no solver can run.
    pub fn validate(&self) -> Result<(), SolverError> {
        let config = self.config;
        if !(config.resolution.is_finite() && config.resolution > 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                config.resolution
            )));
        }
        if !(config.courant > 0.0 && config.courant < 1.0) {
            return Err(SolverError::InvalidConfig(format!(
                "Courant number must lie in (0, 1), got {}",
                config.courant
            )));
        }
        if !(self.run_time.is_finite() && self.run_time >= 0.0) {
            return Err(SolverError::InvalidConfig(format!(
                "run time must be non-negative, got {}",
                self.run_time
            )));
        }
        if (config.domain_extent - self.geometry.domain_extent()).abs() > 1e-12 {
            return Err(SolverError::InvalidConfig(format!(
                "configuration was built for a cell of extent {}, geometry needs {}",
                config.domain_extent,
                self.geometry.domain_extent()
            )));
        }
        self.excitation
            .band
            .validate()
            .map_err(SolverError::InvalidConfig)?;
        Ok(())
    }
}

/// The core trait that all field solvers implement.
pub trait FieldSolver: Send {
    /// Time-step the excitation through the geometry and return the final
    /// field state.
    fn run(&self, request: &RunRequest<'_>) -> Result<Box<dyn SimulationHandle>, SolverError>;

    /// Human-readable name of the solver method.
    fn method_name(&self) -> &str;
}

/// Field state left behind by one solver run.
pub trait SimulationHandle: Send {
    /// Complex amplitude of `component` at `point`.
    fn sample_field(
        &self,
        component: FieldComponent,
        point: &PolarPoint,
    ) -> Result<Complex64, SolverError>;

    /// Electric energy $\frac{1}{2}\int_\text{region} \epsilon |E|^2\,dA$.
    fn field_energy(&self, region: &Region) -> Result<f64, SolverError>;

    /// The probe recording, if the run had a probe.
    fn time_series(&self) -> Option<&TimeSeries>;

    /// Simulation time at which the run stopped.
    fn elapsed_time(&self) -> f64;
}

/// Builds a fresh solver for each independent job.
///
/// Sweeps run jobs concurrently; each job builds its own solver so no grid
/// state is shared between them.
pub trait SolverFactory: Send + Sync {
    fn build(&self) -> Box<dyn FieldSolver>;
}

impl<F> SolverFactory for F
where
    F: Fn() -> Box<dyn FieldSolver> + Send + Sync,
{
    fn build(&self) -> Box<dyn FieldSolver> {
        self()
    }
}
