//! # Ringpert Core
//!
//! Checks first-order perturbation theory against direct simulation for a
//! dielectric ring resonator: how well does the frequency shift predicted
//! from one unperturbed field solution match the shift measured by
//! re-simulating a ring whose outer radius has grown?
//!
//! ## Architecture
//!
//! Field solvers implement [`solver::FieldSolver`]; every run returns a
//! [`solver::SimulationHandle`] that owns its own grid. A
//! [`mode_finder::ModeFinder`] locates a resonance with a broadband run and a
//! [`harminv::HarmonicInversion`], then re-excites it narrowly. The
//! [`sampler::FieldSampler`] integrates the steady-state field, the
//! [`perturbation`] module turns the integrals into a predicted slope, and
//! [`sweep::ConvergenceSweeper`] measures how the prediction error behaves
//! as the perturbation shrinks or the grid is refined.
//!
//! ## Modules
//!
//! - [`types`]: Polarizations, excitations, configurations, modes, sweep points.
//! - [`solver`]: Solver trait, cylindrical FDTD and an analytic surrogate.
//! - [`harminv`]: Harmonic inversion (matrix pencil).
//! - [`mode_finder`]: Two-phase resonance search and mode selection.
//! - [`sampler`]: Wall samples and stored-energy integrals.
//! - [`perturbation`]: The first-order frequency-shift formula.
//! - [`sweep`]: Resolution and perturbation sweeps.
//! - [`analysis`]: Relative errors, error curves, convergence slopes.
//! - [`report`]: Study report and curve renderers.
//! - [`study`]: The end-to-end study.

pub mod analysis;
pub mod error;
pub mod harminv;
pub mod mode_finder;
pub mod perturbation;
pub mod report;
pub mod sampler;
pub mod solver;
pub mod study;
pub mod sweep;
pub mod types;

pub use error::StudyError;
