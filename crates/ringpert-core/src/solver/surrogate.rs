//! Closed-form whispering-gallery surrogate.
//!
//! A stand-in for a field solver whose answers are cheap and exactly
//! reproducible. The fundamental mode of azimuthal order $m$ sits at
//!
//! $$f_0 = \frac{m + \tfrac12}{2\pi n r_\text{mode}}
//!         \left(1 + \frac{\kappa}{\text{res}^2}\right),
//!   \qquad r_\text{mode} = a + 0.4 w$$
//!
//! so growing the outer radius lowers the frequency and the resolution bias
//! vanishes quadratically. A second, lossier radial order sits at
//! $1.35 f_0$. The field is a Gaussian radial profile centred on
//! $r_\text{mode}$ times $e^{im\phi}$. Stored energy is normalised so that the
//! first-order perturbation formula reproduces the model's own
//! $\partial f/\partial b$.

use std::f64::consts::PI;

use num_complex::Complex64;
use ringpert_geometry::discretise::circle_fraction;
use ringpert_geometry::{PolarPoint, Region, RingGeometry};

use super::source::GaussianPulse;
use super::{FieldSolver, RunRequest, SimulationHandle, SolverError};
use crate::types::{FieldComponent, Polarization, TimeSeries};

/// Position of the mode maximum across the waveguide, as a fraction of $w$.
const MODE_CENTRE: f64 = 0.4;
/// Gaussian width of the radial profile, as a fraction of $w$.
const MODE_WIDTH: f64 = 0.35;
/// Frequency ratio of the second radial order to the fundamental.
const SECOND_ORDER_RATIO: f64 = 1.35;
const SECOND_ORDER_AMPLITUDE: f64 = 0.6;
/// Azimuthal order used when the cell carries none.
const DEFAULT_ORDER: i32 = 3;

#[derive(Debug, Clone)]
pub struct SurrogateSolver {
    /// Relative frequency bias $\kappa$ at resolution 1.
    pub discretisation_bias: f64,
    /// $Q$ of the fundamental mode is `base_quality` $\cdot e^{|m|}$.
    pub base_quality: f64,
    /// Ratio of the fundamental's $Q$ to the second order's.
    pub quality_ratio: f64,
    /// Samples per unit time in the recorded ring-down.
    pub samples_per_unit_time: f64,
}

impl Default for SurrogateSolver {
    fn default() -> Self {
        Self {
            discretisation_bias: 0.5,
            base_quality: 20.0,
            quality_ratio: 25.0,
            samples_per_unit_time: 20.0,
        }
    }
}

/// One analytic mode.
#[derive(Debug, Clone, Copy)]
struct AnalyticMode {
    frequency: f64,
    decay_rate: f64,
    weight: f64,
}

impl SurrogateSolver {
    fn order(geometry: &RingGeometry) -> f64 {
        geometry
            .symmetry()
            .azimuthal_order()
            .unwrap_or(DEFAULT_ORDER)
            .abs() as f64
    }

    fn mode_radius(geometry: &RingGeometry) -> f64 {
        geometry.inner_radius() + MODE_CENTRE * geometry.width()
    }

    /// Fundamental frequency of `geometry` at `resolution`.
    pub fn fundamental_frequency(&self, geometry: &RingGeometry, resolution: f64) -> f64 {
        let m = Self::order(geometry);
        (m + 0.5) / (2.0 * PI * geometry.index() * Self::mode_radius(geometry))
            * (1.0 + self.discretisation_bias / (resolution * resolution))
    }

    /// $\partial f_0 / \partial b$ at fixed inner radius.
    pub fn frequency_slope(&self, geometry: &RingGeometry, resolution: f64) -> f64 {
        -self.fundamental_frequency(geometry, resolution) * MODE_CENTRE
            / Self::mode_radius(geometry)
    }

    pub fn fundamental_quality(&self, geometry: &RingGeometry) -> f64 {
        self.base_quality * Self::order(geometry).exp()
    }

    fn modes(&self, geometry: &RingGeometry, resolution: f64, pulse: &GaussianPulse) -> [AnalyticMode; 2] {
        let f0 = self.fundamental_frequency(geometry, resolution);
        let q0 = self.fundamental_quality(geometry);
        let f1 = SECOND_ORDER_RATIO * f0;
        let q1 = q0 / self.quality_ratio;
        [
            AnalyticMode {
                frequency: f0,
                decay_rate: PI * f0 / q0,
                weight: pulse.spectral_weight(f0),
            },
            AnalyticMode {
                frequency: f1,
                decay_rate: PI * f1 / q1,
                weight: SECOND_ORDER_AMPLITUDE * pulse.spectral_weight(f1),
            },
        ]
    }
}

impl FieldSolver for SurrogateSolver {
    fn run(&self, request: &RunRequest<'_>) -> Result<Box<dyn SimulationHandle>, SolverError> {
        request.validate()?;
        let geometry = request.geometry.clone();
        let resolution = request.config.resolution;
        let pulse = GaussianPulse::new(&request.excitation.band);
        let modes = self.modes(&geometry, resolution, &pulse);
        let drive: f64 = request.excitation.sources.iter().map(|s| s.amplitude.norm()).sum();

        let mut sim = SurrogateSimulation {
            m: Self::order(&geometry),
            amplitude: drive * modes[0].weight,
            frequency: modes[0].frequency,
            slope: self.frequency_slope(&geometry, resolution),
            polarization: request.config.polarization,
            extent: request.config.domain_extent,
            time: pulse.end_time() + request.run_time,
            series: None,
            geometry,
        };

        if let Some(probe) = &request.probe {
            sim.check_inside(&probe.position)?;
            let dt = 1.0 / self.samples_per_unit_time;
            let count = (request.run_time / dt).ceil() as usize;
            let carried = if probe.component == sim.polarization.source_component() {
                drive
            } else {
                0.0
            };
            let samples = (0..count)
                .map(|k| {
                    let t = k as f64 * dt;
                    modes
                        .iter()
                        .map(|mode| {
                            carried
                                * mode.weight
                                * sim.profile(probe.position.radius)
                                * (-mode.decay_rate * t).exp()
                                * (2.0 * PI * mode.frequency * t).cos()
                        })
                        .sum::<f64>()
                })
                .collect();
            sim.series = Some(TimeSeries {
                dt,
                start_time: pulse.end_time(),
                samples,
            });
        }

        Ok(Box::new(sim))
    }

    fn method_name(&self) -> &str {
        "Surrogate WGM"
    }
}

/// Steady-state field of the fundamental surrogate mode.
pub struct SurrogateSimulation {
    geometry: RingGeometry,
    m: f64,
    amplitude: f64,
    frequency: f64,
    slope: f64,
    polarization: Polarization,
    extent: f64,
    time: f64,
    series: Option<TimeSeries>,
}

impl SurrogateSimulation {
    fn check_inside(&self, point: &PolarPoint) -> Result<(), SolverError> {
        if point.radius.is_finite() && point.radius >= 0.0 && point.radius <= self.extent {
            Ok(())
        } else {
            Err(SolverError::OutsideDomain {
                radius: point.radius,
                extent: self.extent,
            })
        }
    }

    fn profile(&self, r: f64) -> f64 {
        let centre = SurrogateSolver::mode_radius(&self.geometry);
        let sigma = MODE_WIDTH * self.geometry.width();
        (-0.5 * ((r - centre) / sigma).powi(2)).exp()
    }

    /// Total stored energy, calibrated against the model's own dispersion.
    fn total_energy(&self) -> f64 {
        if self.amplitude == 0.0 {
            return 0.0;
        }
        let a = self.geometry.inner_radius();
        let b = self.geometry.outer_radius();
        let wall_mean = 0.5 * (self.profile(a) + self.profile(b));
        let surface = 2.0 * PI * b * self.amplitude * wall_mean;
        self.frequency * surface / (4.0 * self.slope.abs())
    }

    /// Share of the stored energy inside `region`.
    fn energy_fraction(&self, region: &Region) -> f64 {
        const STEPS: usize = 400;
        let centre = SurrogateSolver::mode_radius(&self.geometry);
        let sigma = MODE_WIDTH * self.geometry.width();
        let lo = (centre - 8.0 * sigma).max(0.0);
        let hi = centre + 8.0 * sigma;
        let h = (hi - lo) / STEPS as f64;
        let (inside, total) = (0..STEPS).fold((0.0, 0.0), |(inside, total), k| {
            let r = lo + (k as f64 + 0.5) * h;
            let w = self.profile(r).powi(2) * r;
            (inside + w * circle_fraction(region, r, 256), total + w)
        });
        if total > 0.0 {
            inside / total
        } else {
            0.0
        }
    }
}

impl SimulationHandle for SurrogateSimulation {
    fn sample_field(
        &self,
        component: FieldComponent,
        point: &PolarPoint,
    ) -> Result<Complex64, SolverError> {
        self.check_inside(point)?;
        let radial = self.amplitude * self.profile(point.radius);
        let phase = Complex64::from_polar(1.0, self.m * point.angle);
        let (sin, cos) = point.angle.sin_cos();
        let value = match (self.polarization, component) {
            (Polarization::Ez, FieldComponent::Ez) => radial,
            (Polarization::Hz, FieldComponent::Hz | FieldComponent::Ep) => radial,
            (Polarization::Hz, FieldComponent::Ex) => -radial * sin,
            (Polarization::Hz, FieldComponent::Ey) => radial * cos,
            _ => 0.0,
        };
        Ok(phase * value)
    }

    fn field_energy(&self, region: &Region) -> Result<f64, SolverError> {
        region.validate()?;
        Ok(self.total_energy() * self.energy_fraction(region))
    }

    fn time_series(&self) -> Option<&TimeSeries> {
        self.series.as_ref()
    }

    fn elapsed_time(&self) -> f64 {
        self.time
    }
}
