//! Core types shared across the ringpert workspace.
//!
//! This module defines the data that flows between solver runs, the mode
//! finder, the perturbation estimator and the sweeps: polarizations and field
//! components, excitations, per-run simulation configuration, resonance
//! modes, recorded time series and sweep results.

use std::fmt;

use num_complex::Complex64;
use ringpert_geometry::{Dimensionality, PolarPoint, RingGeometry};
use serde::{Deserialize, Serialize};

/// Field polarization in the 2D / cylindrical cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarization {
    /// Electric field out of the plane ($E_z$, $H_r$, $H_\phi$).
    Ez,
    /// Magnetic field out of the plane ($H_z$, $E_r$, $E_\phi$).
    Hz,
}

impl Polarization {
    /// The component driven by the source and recorded for harmonic
    /// inversion.
    pub fn source_component(&self) -> FieldComponent {
        match self {
            Polarization::Ez => FieldComponent::Ez,
            Polarization::Hz => FieldComponent::Hz,
        }
    }

    /// Electric field components tangential to a circular wall.
    ///
    /// For $E_z$ polarization this is $E_z$ alone; for $H_z$ it is $E_\phi$
    /// (and $E_z$, which vanishes in a 2D $H_z$ cell but is sampled anyway).
    pub fn parallel_components(&self) -> &'static [FieldComponent] {
        match self {
            Polarization::Ez => &[FieldComponent::Ez],
            Polarization::Hz => &[FieldComponent::Ep, FieldComponent::Ez],
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarization::Ez => write!(f, "Ez"),
            Polarization::Hz => write!(f, "Hz"),
        }
    }
}

/// A single field component, in Cartesian or polar form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldComponent {
    Ex,
    Ey,
    Ez,
    /// Radial electric field.
    Er,
    /// Azimuthal electric field.
    Ep,
    Hx,
    Hy,
    Hz,
    Hr,
    Hp,
}

impl FieldComponent {
    pub fn is_electric(&self) -> bool {
        matches!(
            self,
            FieldComponent::Ex
                | FieldComponent::Ey
                | FieldComponent::Ez
                | FieldComponent::Er
                | FieldComponent::Ep
        )
    }
}

/// A Gaussian excitation band: centre frequency and full width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExcitationBand {
    pub center: f64,
    pub width: f64,
}

impl ExcitationBand {
    /// Construct a band, rejecting non-positive or non-finite values.
    pub fn new(center: f64, width: f64) -> Result<Self, String> {
        let band = Self { center, width };
        band.validate()?;
        Ok(band)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.center.is_finite() && self.center > 0.0) {
            return Err(format!("band centre must be positive, got {}", self.center));
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(format!("band width must be positive, got {}", self.width));
        }
        Ok(())
    }

    pub fn lower(&self) -> f64 {
        self.center - 0.5 * self.width
    }

    pub fn upper(&self) -> f64 {
        self.center + 0.5 * self.width
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.lower() && frequency <= self.upper()
    }
}

impl fmt::Display for ExcitationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fcen={:.4}, df={:.4}", self.center, self.width)
    }
}

/// A point current source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
    pub component: FieldComponent,
    pub position: PolarPoint,
    pub amplitude: Complex64,
}

/// Gaussian-pulse excitation: a band and the sources that radiate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excitation {
    pub band: ExcitationBand,
    pub sources: Vec<PointSource>,
}

impl Excitation {
    /// A single unit-amplitude source.
    pub fn point(band: ExcitationBand, component: FieldComponent, position: PolarPoint) -> Self {
        Self {
            band,
            sources: vec![PointSource {
                component,
                position,
                amplitude: Complex64::new(1.0, 0.0),
            }],
        }
    }
}

/// Where and what to record while the fields ring down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub component: FieldComponent,
    pub position: PolarPoint,
}

/// Absorbing boundary layer: graded conductivity profile.
///
/// The conductivity rises as $\sigma(x) = \sigma_\max x^p$ with depth $x \in
/// [0, 1]$ into the layer, where $\sigma_\max$ is chosen for a target
/// round-trip reflection at normal incidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbsorberSpec {
    /// Polynomial grading order $p$.
    pub profile_order: f64,
    /// Target reflection coefficient $R$.
    pub reflection: f64,
}

impl Default for AbsorberSpec {
    fn default() -> Self {
        Self {
            profile_order: 2.0,
            reflection: 1e-6,
        }
    }
}

/// Resolution-independent solver settings, shared by every run of a study.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub polarization: Polarization,
    pub absorber: AbsorberSpec,
    /// Courant number $S = c\,\Delta t / \Delta x$ (before the azimuthal
    /// stability correction).
    pub courant: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            polarization: Polarization::Ez,
            absorber: AbsorberSpec::default(),
            courant: 0.5,
        }
    }
}

impl SimulationSettings {
    /// Build the configuration for one `(geometry, resolution)` pair.
    pub fn config_for(&self, geometry: &RingGeometry, resolution: f64) -> SimulationConfig {
        SimulationConfig {
            dimensionality: geometry.dimensionality(),
            domain_extent: geometry.domain_extent(),
            resolution,
            polarization: self.polarization,
            absorber: self.absorber,
            courant: self.courant,
        }
    }
}

/// Configuration of a single solver run.
///
/// There is exactly one configuration per `(geometry, resolution)` pair; it
/// is derived from the geometry via [`SimulationSettings::config_for`] and
/// never reused for a different geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    pub dimensionality: Dimensionality,
    /// Radial extent (cylindrical) or side length (Cartesian) of the cell.
    pub domain_extent: f64,
    /// Grid points per unit length.
    pub resolution: f64,
    pub polarization: Polarization,
    pub absorber: AbsorberSpec,
    pub courant: f64,
}

impl SimulationConfig {
    /// Grid spacing $\Delta = 1 / \text{resolution}$.
    pub fn grid_spacing(&self) -> f64 {
        1.0 / self.resolution
    }
}

/// A resonant mode: complex frequency $\omega = 2\pi f - i\gamma$.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResonanceMode {
    /// Real frequency $f$.
    pub frequency: f64,
    /// Quality factor $Q = \pi f / \gamma$.
    pub quality_factor: f64,
    /// Amplitude decay rate $\gamma$ (positive for a decaying mode).
    pub decay_rate: f64,
    /// Real amplitude of the mode in the recorded signal.
    pub amplitude: f64,
    /// Relative fit error of the mode.
    pub error: f64,
}

/// Real samples of one field component taken every `dt`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub dt: f64,
    /// Simulation time of the first sample.
    pub start_time: f64,
    pub samples: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.dt * self.samples.len() as f64
    }
}

/// Magnitude of the tangential electric field at one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSample {
    pub point: PolarPoint,
    pub magnitude: f64,
}

/// Field magnitudes on one boundary circle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundarySamples {
    pub radius: f64,
    pub samples: Vec<FieldSample>,
}

impl BoundarySamples {
    pub fn mean_magnitude(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.magnitude).sum::<f64>() / self.samples.len() as f64
    }

    /// Relative spread $(\max - \min) / \text{mean}$ of the magnitudes.
    ///
    /// Zero for a perfectly rotationally symmetric mode.
    pub fn relative_spread(&self) -> f64 {
        let mean = self.mean_magnitude();
        if mean == 0.0 {
            return 0.0;
        }
        let (lo, hi) = self
            .samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.magnitude), hi.max(s.magnitude))
            });
        (hi - lo) / mean
    }
}

/// Numerator of the perturbation formula, $\oint |E_\parallel|^2$ proxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurfaceIntegral(pub f64);

/// Denominator of the perturbation formula, stored electric energy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeIntegral(pub f64);

/// Which parameter a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepAxis {
    Resolution,
    Perturbation,
}

impl fmt::Display for SweepAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepAxis::Resolution => write!(f, "resolution"),
            SweepAxis::Perturbation => write!(f, "dr"),
        }
    }
}

/// Comparison of the predicted and finite-difference frequency derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivativeCheck {
    /// $d\omega/dR$ from the perturbation formula.
    pub analytic: f64,
    /// $(f(R + dr) - f(R)) / dr$ from the two measurements.
    pub empirical: f64,
    /// $|(\text{empirical} - \text{analytic}) / \text{analytic}|$, absent
    /// when the analytic derivative is zero.
    pub relative_error: Option<f64>,
}

/// One measured point of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    /// Position of this point in the requested sweep values.
    pub index: usize,
    /// The sweep variable: a resolution or a radius perturbation.
    pub independent_variable: f64,
    /// The radius perturbation applied at this point.
    pub dr: f64,
    /// The resolution the perturbed ring was simulated at.
    pub resolution: f64,
    pub predicted_frequency: f64,
    pub measured_frequency: f64,
    pub measured_quality_factor: f64,
    /// $|(\text{predicted} - \text{measured}) / \text{measured}|$.
    pub relative_error: f64,
    pub derivative: Option<DerivativeCheck>,
}

/// A sweep value that produced no point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepFailure {
    pub index: usize,
    pub independent_variable: f64,
    pub reason: String,
}

/// Points of one sweep, ordered by index, plus the values that failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub axis: SweepAxis,
    pub points: Vec<SweepPoint>,
    pub failures: Vec<SweepFailure>,
}

impl SweepResult {
    pub fn empty(axis: SweepAxis) -> Self {
        Self {
            axis,
            points: Vec::new(),
            failures: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringpert_geometry::Symmetry;

    #[test]
    fn test_parallel_components() {
        assert_eq!(Polarization::Ez.parallel_components(), &[FieldComponent::Ez]);
        assert_eq!(
            Polarization::Hz.parallel_components(),
            &[FieldComponent::Ep, FieldComponent::Ez]
        );
        assert!(Polarization::Hz
            .parallel_components()
            .iter()
            .all(|c| c.is_electric()));
    }

    #[test]
    fn test_band_validation_and_edges() {
        let band = ExcitationBand::new(0.15, 0.1).unwrap();
        assert!((band.lower() - 0.10).abs() < 1e-12);
        assert!((band.upper() - 0.20).abs() < 1e-12);
        assert!(band.contains(0.118));
        assert!(!band.contains(0.25));
        assert!(ExcitationBand::new(0.0, 0.1).is_err());
        assert!(ExcitationBand::new(0.15, -0.1).is_err());
        assert!(ExcitationBand::new(f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_config_follows_geometry() {
        let ring = RingGeometry::new(1.0, 1.0, 3.4, 4.0, 2.0, Symmetry::Azimuthal { m: 3 }).unwrap();
        let grown = ring.with_outer_radius_shift(0.5).unwrap();
        let settings = SimulationSettings::default();
        let a = settings.config_for(&ring, 20.0);
        let b = settings.config_for(&grown, 20.0);
        assert_eq!(a.domain_extent, 8.0);
        assert_eq!(b.domain_extent, 8.5);
        assert_eq!(a.dimensionality, Dimensionality::Cylindrical);
        assert!((a.grid_spacing() - 0.05).abs() < 1e-15);
    }

    #[test]
    fn test_boundary_spread() {
        let samples = BoundarySamples {
            radius: 2.0,
            samples: vec![
                FieldSample { point: PolarPoint::new(2.0, 0.0), magnitude: 1.0 },
                FieldSample { point: PolarPoint::new(2.0, 1.0), magnitude: 3.0 },
            ],
        };
        assert_eq!(samples.mean_magnitude(), 2.0);
        assert_eq!(samples.relative_spread(), 1.0);
    }
}
