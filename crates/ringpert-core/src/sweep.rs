//! Convergence sweeps over resolution and perturbation amount.
//!
//! Every sweep value is an independent job: it perturbs the baseline ring,
//! builds its own solver from the factory, runs the full two-phase mode
//! search and compares the measured frequency with the first-order
//! prediction. Jobs run on a [`ComputeBackend`]; results are reassembled by
//! index so the output order never depends on the backend.
//!
//! A job that fails (no resonance, degenerate comparison, solver error) is
//! logged and recorded as a [`SweepFailure`]; the remaining points are kept.
//! A job that panics is recorded the same way.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::{info, warn};
use ringpert_compute::{map_indexed, ComputeBackend};
use ringpert_geometry::RingGeometry;

use crate::analysis::relative_error;
use crate::error::StudyError;
use crate::mode_finder::ModeFinder;
use crate::perturbation::PerturbationEstimate;
use crate::solver::SolverFactory;
use crate::types::{
    DerivativeCheck, ExcitationBand, SimulationSettings, SweepAxis, SweepFailure, SweepPoint,
    SweepResult,
};

/// `count` values logarithmically spaced from $10^\text{start}$ to
/// $10^\text{stop}$ inclusive.
pub fn log_space(start_exponent: f64, stop_exponent: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![10f64.powf(start_exponent)],
        _ => {
            let step = (stop_exponent - start_exponent) / (count - 1) as f64;
            (0..count)
                .map(|k| 10f64.powf(start_exponent + step * k as f64))
                .collect()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// The unperturbed measurement every sweep point is compared against.
#[derive(Debug, Clone, Copy)]
pub struct SweepBaseline {
    /// Resolution of the baseline run (used by the perturbation sweep).
    pub resolution: f64,
    pub estimate: PerturbationEstimate,
}

/// Runs the two sweeps against a fixed baseline.
pub struct ConvergenceSweeper<'a> {
    pub factory: &'a dyn SolverFactory,
    pub backend: &'a dyn ComputeBackend,
    pub mode_finder: &'a ModeFinder<'a>,
    pub settings: SimulationSettings,
    pub baseline: SweepBaseline,
    /// Width of the discovery band centred on the baseline frequency.
    pub band_width: f64,
}

impl ConvergenceSweeper<'_> {
    /// Measure the ring perturbed by `dr` at each resolution.
    pub fn sweep_resolution(
        &self,
        geometry: &RingGeometry,
        resolutions: &[f64],
        dr: f64,
    ) -> Result<SweepResult, StudyError> {
        if let Some(bad) = resolutions.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
            return Err(StudyError::InvalidParameter(format!(
                "resolutions must be positive, got {bad}"
            )));
        }
        info!("Resolution sweep: {} values at dr={:.3e}", resolutions.len(), dr);
        self.run(SweepAxis::Resolution, resolutions, |resolution| {
            self.measure(geometry, dr, resolution, false)
        })
    }

    /// Measure the ring perturbed by each `dr` at the baseline resolution.
    pub fn sweep_perturbation(
        &self,
        geometry: &RingGeometry,
        drs: &[f64],
    ) -> Result<SweepResult, StudyError> {
        if let Some(bad) = drs.iter().find(|d| !(d.is_finite() && **d > 0.0)) {
            return Err(StudyError::InvalidParameter(format!(
                "perturbation amounts must be positive, got {bad}"
            )));
        }
        info!(
            "Perturbation sweep: {} values at resolution {}",
            drs.len(),
            self.baseline.resolution
        );
        self.run(SweepAxis::Perturbation, drs, |dr| {
            self.measure(geometry, dr, self.baseline.resolution, true)
        })
    }

    fn run<F>(&self, axis: SweepAxis, values: &[f64], job: F) -> Result<SweepResult, StudyError>
    where
        F: Fn(f64) -> Result<SweepPoint, StudyError> + Send + Sync,
    {
        let outcomes = map_indexed(self.backend, values.len(), |index| {
            // panics become per-point failures
            catch_unwind(AssertUnwindSafe(|| job(values[index])))
                .unwrap_or_else(|payload| Err(StudyError::JobPanicked(panic_message(payload.as_ref()))))
                .map(|point| SweepPoint { index, ..point })
        })?;

        let mut result = SweepResult::empty(axis);
        for (index, outcome) in outcomes.into_iter().enumerate() {
            let value = values[index];
            match outcome {
                Ok(point) => {
                    if point.index != index || point.independent_variable.to_bits() != value.to_bits() {
                        return Err(StudyError::InconsistentSweepState {
                            index,
                            detail: format!(
                                "point for {axis}={} arrived at index {} (expected {axis}={value})",
                                point.independent_variable, point.index
                            ),
                        });
                    }
                    info!(
                        "[{}/{}] {axis}={:.4e}: measured {:.9}, predicted {:.9}, rel. error {:.3e}",
                        index + 1,
                        values.len(),
                        value,
                        point.measured_frequency,
                        point.predicted_frequency,
                        point.relative_error
                    );
                    result.points.push(point);
                }
                Err(e) => {
                    warn!("{axis}={value:.4e} failed: {e}");
                    result.failures.push(SweepFailure {
                        index,
                        independent_variable: value,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }

    /// One full measurement of the ring grown by `dr` at `resolution`.
    fn measure(
        &self,
        geometry: &RingGeometry,
        dr: f64,
        resolution: f64,
        check_derivative: bool,
    ) -> Result<SweepPoint, StudyError> {
        let perturbed = geometry.with_outer_radius_shift(dr)?;
        let config = self.settings.config_for(&perturbed, resolution);
        let band = ExcitationBand::new(self.baseline.estimate.baseline_frequency, self.band_width)
            .map_err(StudyError::InvalidParameter)?;

        let solver = self.factory.build();
        let steady = self
            .mode_finder
            .find_resonance(solver.as_ref(), &perturbed, &config, &band)?;
        drop(steady.simulation);

        let measured = steady.mode.frequency;
        let predicted = self.baseline.estimate.predict(dr);
        let derivative = check_derivative.then(|| {
            let analytic = self.baseline.estimate.dw_dr;
            let empirical = (measured - self.baseline.estimate.baseline_frequency) / dr;
            DerivativeCheck {
                analytic,
                empirical,
                relative_error: relative_error(empirical, analytic).ok(),
            }
        });

        Ok(SweepPoint {
            index: 0,
            independent_variable: if check_derivative { dr } else { resolution },
            dr,
            resolution,
            predicted_frequency: predicted,
            measured_frequency: measured,
            measured_quality_factor: steady.mode.quality_factor,
            relative_error: relative_error(predicted, measured)?,
            derivative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_log_space_matches_endpoints() {
        let drs = log_space(-7.0, -1.5, 10);
        assert_eq!(drs.len(), 10);
        assert_relative_eq!(drs[0], 1e-7, max_relative = 1e-12);
        assert_relative_eq!(drs[9], 10f64.powf(-1.5), max_relative = 1e-12);
        assert!(drs.windows(2).all(|w| w[1] > w[0]));
        let ratio = drs[1] / drs[0];
        assert_relative_eq!(drs[5] / drs[4], ratio, max_relative = 1e-9);
    }

    #[test]
    fn test_log_space_degenerate_counts() {
        assert!(log_space(-3.0, -1.0, 0).is_empty());
        let single = log_space(-2.0, -1.0, 1);
        assert_eq!(single.len(), 1);
        assert_relative_eq!(single[0], 0.01, max_relative = 1e-12);
    }
}
