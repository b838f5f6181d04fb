//! Two-phase resonance search.
//!
//! 1. **Discovery**: a broadband pulse excites the ring, the ring-down at the
//!    probe point is recorded, and harmonic inversion lists the candidate
//!    modes in the band. A [`SelectionPolicy`] picks one.
//! 2. **Steady state**: a fresh run with a narrow pulse centred on the chosen
//!    frequency excites essentially that mode alone; its final field state is
//!    what the sampler integrates.
//!
//! The discovery run is dropped before the steady-state run starts, so at
//! most one grid per job is alive at a time.

use log::{debug, info};
use ringpert_geometry::RingGeometry;
use serde::{Deserialize, Serialize};

use crate::error::StudyError;
use crate::harminv::HarmonicInversion;
use crate::solver::{FieldSolver, RunRequest, SimulationHandle};
use crate::types::{Excitation, ExcitationBand, Probe, ResonanceMode, SimulationConfig};

/// How one mode is chosen among several candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Highest quality factor among decaying modes.
    #[default]
    MaxQuality,
    /// Smallest harmonic-inversion fit error.
    LowestError,
}

impl SelectionPolicy {
    /// Pick a mode, or `None` if no candidate qualifies.
    ///
    /// Ties are broken by lower frequency, so the choice never depends on the
    /// order of `candidates`.
    pub fn select(&self, candidates: &[ResonanceMode]) -> Option<ResonanceMode> {
        let eligible = candidates
            .iter()
            .filter(|m| m.frequency.is_finite() && m.decay_rate > 0.0);
        match self {
            SelectionPolicy::MaxQuality => eligible.max_by(|a, b| {
                a.quality_factor
                    .total_cmp(&b.quality_factor)
                    .then(b.frequency.total_cmp(&a.frequency))
            }),
            SelectionPolicy::LowestError => eligible.min_by(|a, b| {
                a.error
                    .total_cmp(&b.error)
                    .then(a.frequency.total_cmp(&b.frequency))
            }),
        }
        .copied()
    }
}

/// Run lengths and the narrow-band width of the steady-state phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeFinderSettings {
    /// Ring-down time recorded after the broadband pulse.
    pub discovery_run_time: f64,
    /// Pulse width of the steady-state phase.
    pub steady_width: f64,
    /// Time stepped after the narrow pulse before the fields are sampled.
    pub steady_run_time: f64,
    pub policy: SelectionPolicy,
}

impl Default for ModeFinderSettings {
    fn default() -> Self {
        Self {
            discovery_run_time: 200.0,
            steady_width: 0.01,
            steady_run_time: 200.0,
            policy: SelectionPolicy::MaxQuality,
        }
    }
}

/// Outcome of the discovery phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub mode: ResonanceMode,
    /// Every mode the harmonic inversion reported, sorted by frequency.
    pub candidates: Vec<ResonanceMode>,
}

/// A selected mode together with the field state excited at its frequency.
pub struct SteadyState {
    pub mode: ResonanceMode,
    pub candidates: Vec<ResonanceMode>,
    pub simulation: Box<dyn SimulationHandle>,
}

/// Locates one resonance of a geometry.
pub struct ModeFinder<'a> {
    harminv: &'a dyn HarmonicInversion,
    settings: ModeFinderSettings,
}

impl<'a> ModeFinder<'a> {
    pub fn new(harminv: &'a dyn HarmonicInversion, settings: ModeFinderSettings) -> Self {
        Self { harminv, settings }
    }

    pub fn settings(&self) -> &ModeFinderSettings {
        &self.settings
    }

    /// Broadband run and harmonic inversion; returns the selected mode.
    pub fn discover(
        &self,
        solver: &dyn FieldSolver,
        geometry: &RingGeometry,
        config: &SimulationConfig,
        band: &ExcitationBand,
    ) -> Result<Discovery, StudyError> {
        band.validate().map_err(StudyError::InvalidParameter)?;
        let component = config.polarization.source_component();
        let excitation = Excitation::point(*band, component, geometry.probe_point());
        let request = RunRequest {
            geometry,
            config,
            excitation: &excitation,
            run_time: self.settings.discovery_run_time,
            probe: Some(Probe {
                component,
                position: geometry.probe_point(),
            }),
        };

        let simulation = solver.run(&request)?;
        let series = simulation.time_series().ok_or_else(|| {
            StudyError::InvalidParameter(format!(
                "{} returned no probe recording",
                solver.method_name()
            ))
        })?;
        let candidates = self.harminv.extract_modes(series, band)?;
        drop(simulation);

        debug!(
            "{} found {} resonant mode(s) for {} at resolution {}",
            self.harminv.method_name(),
            candidates.len(),
            geometry,
            config.resolution
        );
        for mode in &candidates {
            debug!("  f={:.9}, Q={:.2}, error={:.2e}", mode.frequency, mode.quality_factor, mode.error);
        }

        let mode = self
            .settings
            .policy
            .select(&candidates)
            .ok_or_else(|| StudyError::NoResonanceFound {
                band: *band,
                geometry: Box::new(geometry.clone()),
            })?;
        Ok(Discovery { mode, candidates })
    }

    /// Discovery followed by a narrow-band run at the selected frequency.
    pub fn find_resonance(
        &self,
        solver: &dyn FieldSolver,
        geometry: &RingGeometry,
        config: &SimulationConfig,
        band: &ExcitationBand,
    ) -> Result<SteadyState, StudyError> {
        let Discovery { mode, candidates } = self.discover(solver, geometry, config, band)?;
        info!(
            "Selected mode f={:.9} (Q={:.1}) for {} at resolution {}",
            mode.frequency, mode.quality_factor, geometry, config.resolution
        );

        let narrow = ExcitationBand::new(mode.frequency, self.settings.steady_width)
            .map_err(StudyError::InvalidParameter)?;
        let excitation = Excitation::point(
            narrow,
            config.polarization.source_component(),
            geometry.probe_point(),
        );
        let request = RunRequest {
            geometry,
            config,
            excitation: &excitation,
            run_time: self.settings.steady_run_time,
            probe: None,
        };
        let simulation = solver.run(&request)?;

        Ok(SteadyState {
            mode,
            candidates,
            simulation,
        })
    }
}
