//! End-to-end perturbation study.
//!
//! 1. Find the baseline resonance at the baseline resolution and sample its
//!    wall integral and stored energy.
//! 2. Turn those into a predicted $d\omega/dR$.
//! 3. Sweep the perturbation amount at the baseline resolution.
//! 4. Sweep the resolution at the largest perturbation amount.
//! 5. Collect everything into a [`StudyReport`].
//!
//! Any failure in step 1 or 2 aborts the study; sweep failures only drop the
//! affected points.

use log::info;
use ringpert_compute::ComputeBackend;
use ringpert_geometry::RingGeometry;
use serde::{Deserialize, Serialize};

use crate::error::StudyError;
use crate::harminv::HarmonicInversion;
use crate::mode_finder::{ModeFinder, ModeFinderSettings};
use crate::perturbation::PerturbationEstimate;
use crate::report::{BaselineSummary, StudyReport};
use crate::sampler::FieldSampler;
use crate::solver::SolverFactory;
use crate::sweep::{log_space, ConvergenceSweeper, SweepBaseline};
use crate::types::{ExcitationBand, SimulationSettings, SweepAxis, SweepResult};

/// Numerical parameters of a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySettings {
    pub simulation: SimulationSettings,
    pub mode_finder: ModeFinderSettings,
    pub baseline_resolution: f64,
    /// Broadband pulse of the baseline discovery run.
    pub discovery_band: ExcitationBand,
    /// Width of the discovery band each sweep point searches around the
    /// baseline frequency.
    pub sweep_band_width: f64,
    /// Angles sampled on each ring wall.
    pub angle_count: usize,
    pub resolutions: Vec<f64>,
    pub perturbations: Vec<f64>,
}

impl Default for StudySettings {
    fn default() -> Self {
        Self {
            simulation: SimulationSettings::default(),
            mode_finder: ModeFinderSettings::default(),
            baseline_resolution: 100.0,
            discovery_band: ExcitationBand {
                center: 0.15,
                width: 0.1,
            },
            sweep_band_width: 0.01,
            angle_count: 10,
            resolutions: vec![10.0, 20.0, 40.0, 80.0, 100.0, 160.0, 320.0],
            perturbations: log_space(-7.0, -1.5, 10),
        }
    }
}

impl StudySettings {
    pub fn validate(&self) -> Result<(), StudyError> {
        if !(self.baseline_resolution.is_finite() && self.baseline_resolution > 0.0) {
            return Err(StudyError::InvalidParameter(format!(
                "baseline resolution must be positive, got {}",
                self.baseline_resolution
            )));
        }
        self.discovery_band
            .validate()
            .map_err(StudyError::InvalidParameter)?;
        if !(self.sweep_band_width.is_finite() && self.sweep_band_width > 0.0) {
            return Err(StudyError::InvalidParameter(format!(
                "sweep band width must be positive, got {}",
                self.sweep_band_width
            )));
        }
        if !(self.mode_finder.steady_width.is_finite() && self.mode_finder.steady_width > 0.0) {
            return Err(StudyError::InvalidParameter(format!(
                "steady-state band width must be positive, got {}",
                self.mode_finder.steady_width
            )));
        }
        if self.angle_count == 0 {
            return Err(StudyError::InvalidParameter(
                "angle count must be at least 1".into(),
            ));
        }
        if self.perturbations.is_empty() {
            return Err(StudyError::InvalidParameter(
                "at least one perturbation amount is required".into(),
            ));
        }
        Ok(())
    }

    /// The perturbation amount used by the resolution sweep.
    pub fn largest_perturbation(&self) -> Option<f64> {
        self.perturbations
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, dr| Some(acc.map_or(dr, |a| a.max(dr))))
    }
}

/// A configured study over one ring.
pub struct PerturbationStudy<'a> {
    pub geometry: RingGeometry,
    pub settings: StudySettings,
    pub factory: &'a dyn SolverFactory,
    pub harminv: &'a dyn HarmonicInversion,
    pub backend: &'a dyn ComputeBackend,
}

impl PerturbationStudy<'_> {
    /// Steps 1 and 2: locate the baseline mode and predict $d\omega/dR$.
    pub fn run_baseline(&self) -> Result<BaselineSummary, StudyError> {
        self.settings.validate()?;
        let settings = &self.settings;
        let finder = ModeFinder::new(self.harminv, settings.mode_finder);
        let config = settings
            .simulation
            .config_for(&self.geometry, settings.baseline_resolution);
        let solver = self.factory.build();

        info!(
            "Baseline: {} with {} at resolution {}",
            self.geometry,
            solver.method_name(),
            settings.baseline_resolution
        );
        let steady = finder.find_resonance(
            solver.as_ref(),
            &self.geometry,
            &config,
            &settings.discovery_band,
        )?;

        let sampler = FieldSampler::new(settings.simulation.polarization);
        let numerator = sampler.ring_surface_integral(
            steady.simulation.as_ref(),
            &self.geometry,
            settings.angle_count,
        )?;
        let denominator = sampler.sample_volume(
            steady.simulation.as_ref(),
            &self.geometry.energy_reference_region(),
        )?;
        let estimate = PerturbationEstimate::new(&steady.mode, numerator, denominator)?;
        info!(
            "Baseline f={:.9}, surface {:.6e}, energy {:.6e}, dw/dR={:.6e}",
            steady.mode.frequency, numerator.0, denominator.0, estimate.dw_dr
        );

        Ok(BaselineSummary {
            resolution: settings.baseline_resolution,
            mode: steady.mode,
            candidates: steady.candidates,
            estimate,
        })
    }

    /// Run every step and assemble the report.
    pub fn run(&self) -> Result<StudyReport, StudyError> {
        let baseline = self.run_baseline()?;
        let settings = &self.settings;
        let finder = ModeFinder::new(self.harminv, settings.mode_finder);
        let sweeper = ConvergenceSweeper {
            factory: self.factory,
            backend: self.backend,
            mode_finder: &finder,
            settings: settings.simulation,
            baseline: SweepBaseline {
                resolution: baseline.resolution,
                estimate: baseline.estimate,
            },
            band_width: settings.sweep_band_width,
        };

        let perturbation_sweep = sweeper.sweep_perturbation(&self.geometry, &settings.perturbations)?;
        let resolution_sweep = match settings.largest_perturbation() {
            Some(dr) if !settings.resolutions.is_empty() => {
                sweeper.sweep_resolution(&self.geometry, &settings.resolutions, dr)?
            }
            _ => SweepResult::empty(SweepAxis::Resolution),
        };

        let solver_name = self.factory.build().method_name().to_string();
        Ok(StudyReport::new(
            self.geometry.clone(),
            settings.simulation.polarization,
            &solver_name,
            self.harminv.method_name(),
            baseline,
            perturbation_sweep,
            resolution_sweep,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = StudySettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.perturbations.len(), 10);
        assert_eq!(settings.largest_perturbation(), settings.perturbations.last().copied());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = StudySettings::default();
        settings.angle_count = 0;
        assert!(settings.validate().is_err());

        let mut settings = StudySettings::default();
        settings.perturbations.clear();
        assert!(settings.validate().is_err());
        assert_eq!(settings.largest_perturbation(), None);

        let mut settings = StudySettings::default();
        settings.discovery_band.width = 0.0;
        assert!(settings.validate().is_err());
    }
}
