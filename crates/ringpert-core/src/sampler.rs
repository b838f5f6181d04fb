//! Field sampling on the ring walls and energy integrals.
//!
//! The perturbation formula needs two integrals of the steady-state field:
//!
//! - a surface term over the moving wall, approximated by sampling
//!   $|E_\parallel|$ at equally spaced angles on the inner and outer circles
//!   and scaling the mean by the outer circumference $2\pi b$;
//! - a volume term, the electric energy stored in a region around the ring.
//!
//! $|E_\parallel|$ combines every component tangential to the wall for the
//! polarization in use, $\sqrt{\sum_c |E_c|^2}$.

use log::debug;
use ringpert_geometry::discretise::circle_points;
use ringpert_geometry::{Region, RingGeometry};

use crate::error::StudyError;
use crate::solver::SimulationHandle;
use crate::types::{BoundarySamples, FieldSample, Polarization, SurfaceIntegral, VolumeIntegral};

/// Samples tangential fields and stored energy from a finished run.
#[derive(Debug, Clone, Copy)]
pub struct FieldSampler {
    polarization: Polarization,
}

impl FieldSampler {
    pub fn new(polarization: Polarization) -> Self {
        Self { polarization }
    }

    pub fn polarization(&self) -> Polarization {
        self.polarization
    }

    /// Sample $|E_\parallel|$ at `angle_count` equally spaced angles on the
    /// circle of radius `radius`.
    pub fn sample_boundary(
        &self,
        simulation: &dyn SimulationHandle,
        radius: f64,
        angle_count: usize,
    ) -> Result<BoundarySamples, StudyError> {
        if angle_count == 0 {
            return Err(StudyError::InvalidParameter(
                "boundary sampling needs at least one angle".into(),
            ));
        }
        let components = self.polarization.parallel_components();
        let samples = circle_points(radius, angle_count)
            .into_iter()
            .map(|point| {
                let sum_sq = components.iter().try_fold(0.0, |acc, &component| {
                    simulation
                        .sample_field(component, &point)
                        .map(|value| acc + value.norm_sqr())
                })?;
                Ok(FieldSample {
                    point,
                    magnitude: sum_sq.sqrt(),
                })
            })
            .collect::<Result<Vec<_>, StudyError>>()?;

        Ok(BoundarySamples { radius, samples })
    }

    /// Surface integral $2\pi b \cdot \text{mean}|E_\parallel|$ over every
    /// sample of every circle.
    pub fn surface_integral(
        samples: &[BoundarySamples],
        outer_radius: f64,
    ) -> Result<SurfaceIntegral, StudyError> {
        let (sum, count) = samples
            .iter()
            .flat_map(|circle| circle.samples.iter())
            .fold((0.0, 0usize), |(sum, count), s| (sum + s.magnitude, count + 1));
        if count == 0 {
            return Err(StudyError::InvalidParameter(
                "surface integral needs at least one sample".into(),
            ));
        }
        Ok(SurfaceIntegral(
            2.0 * std::f64::consts::PI * outer_radius * sum / count as f64,
        ))
    }

    /// Sample both ring walls and return the surface integral.
    pub fn ring_surface_integral(
        &self,
        simulation: &dyn SimulationHandle,
        geometry: &RingGeometry,
        angle_count: usize,
    ) -> Result<SurfaceIntegral, StudyError> {
        let inner = self.sample_boundary(simulation, geometry.inner_radius(), angle_count)?;
        let outer = self.sample_boundary(simulation, geometry.outer_radius(), angle_count)?;
        debug!(
            "wall samples: inner mean {:.4e} (spread {:.2e}), outer mean {:.4e} (spread {:.2e})",
            inner.mean_magnitude(),
            inner.relative_spread(),
            outer.mean_magnitude(),
            outer.relative_spread()
        );
        Self::surface_integral(&[inner, outer], geometry.outer_radius())
    }

    /// Electric energy stored in `region`.
    pub fn sample_volume(
        &self,
        simulation: &dyn SimulationHandle,
        region: &Region,
    ) -> Result<VolumeIntegral, StudyError> {
        Ok(VolumeIntegral(simulation.field_energy(region)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{SolverError, SimulationHandle};
    use crate::types::{FieldComponent, TimeSeries};
    use approx::assert_relative_eq;
    use num_complex::Complex64;
    use ringpert_geometry::PolarPoint;

    /// $E_z = r\,e^{i\phi}$, $E_\phi = 2$, and a fixed energy.
    struct AnalyticField;

    impl SimulationHandle for AnalyticField {
        fn sample_field(
            &self,
            component: FieldComponent,
            point: &PolarPoint,
        ) -> Result<Complex64, SolverError> {
            Ok(match component {
                FieldComponent::Ez => Complex64::from_polar(point.radius, point.angle),
                FieldComponent::Ep => Complex64::new(2.0, 0.0),
                _ => Complex64::new(0.0, 0.0),
            })
        }

        fn field_energy(&self, region: &Region) -> Result<f64, SolverError> {
            region.validate()?;
            Ok(42.0)
        }

        fn time_series(&self) -> Option<&TimeSeries> {
            None
        }

        fn elapsed_time(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_boundary_magnitudes_are_rotation_invariant() {
        let sampler = FieldSampler::new(Polarization::Ez);
        let circle = sampler.sample_boundary(&AnalyticField, 2.0, 10).unwrap();
        assert_eq!(circle.samples.len(), 10);
        for s in &circle.samples {
            assert_relative_eq!(s.magnitude, 2.0, max_relative = 1e-12);
        }
        assert!(circle.relative_spread() < 1e-12);
    }

    #[test]
    fn test_parallel_components_are_combined() {
        let sampler = FieldSampler::new(Polarization::Hz);
        let circle = sampler.sample_boundary(&AnalyticField, 1.5, 4).unwrap();
        // sqrt(|Ep|^2 + |Ez|^2) = sqrt(4 + 2.25)
        assert_relative_eq!(circle.samples[0].magnitude, 6.25_f64.sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn test_surface_integral_scales_mean_by_circumference() {
        let ring = RingGeometry::new(1.0, 1.0, 3.4, 4.0, 2.0, ringpert_geometry::Symmetry::Azimuthal { m: 3 })
            .unwrap();
        let sampler = FieldSampler::new(Polarization::Ez);
        let integral = sampler.ring_surface_integral(&AnalyticField, &ring, 10).unwrap();
        // mean of |Ez| on r=1 and r=2 is 1.5
        assert_relative_eq!(integral.0, 2.0 * std::f64::consts::PI * 2.0 * 1.5, max_relative = 1e-12);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let sampler = FieldSampler::new(Polarization::Ez);
        assert!(sampler.sample_boundary(&AnalyticField, 1.0, 0).is_err());
        assert!(FieldSampler::surface_integral(&[], 2.0).is_err());
    }

    #[test]
    fn test_volume_delegates_to_solver() {
        let sampler = FieldSampler::new(Polarization::Ez);
        let region = Region::Annulus { inner: 0.0, outer: 4.0 };
        assert_eq!(sampler.sample_volume(&AnalyticField, &region).unwrap().0, 42.0);
        let bad = Region::Annulus { inner: 4.0, outer: 1.0 };
        assert!(sampler.sample_volume(&AnalyticField, &bad).is_err());
    }
}
