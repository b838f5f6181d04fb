//! Cylindrical finite-difference time-domain solver.
//!
//! Fields are taken as $F(r, \phi, t) = F(r, t)\,e^{im\phi}$, which reduces
//! Maxwell's equations in the plane to a 1-D radial problem. Both
//! polarizations share one set of update equations in terms of an
//! out-of-plane scalar $\psi$ and in-plane components $u_r$, $u_\phi$:
//!
//! $$\partial_t u_r = -\frac{im}{r}\psi, \qquad
//!   \partial_t u_\phi = \partial_r \psi, \qquad
//!   \partial_t \psi = \frac{1}{r}\partial_r(r u_\phi) - \frac{im}{r} u_r$$
//!
//! - $E_z$ polarization: $\psi = E_z$, $u_r = H_r$, $u_\phi = H_\phi$, and
//!   $\epsilon$ multiplies $\partial_t\psi$.
//! - $H_z$ polarization: $\psi = H_z$, $u_r = -E_r$, $u_\phi = -E_\phi$, and
//!   $\epsilon$ multiplies $\partial_t u$.
//!
//! The time step is $\Delta t = S\Delta / \sqrt{1 + m^2}$, which keeps the
//! scheme stable for the $m/r$ terms near the axis.

pub(crate) mod absorber;
pub(crate) mod grid;

use std::f64::consts::PI;

use log::debug;
use ndarray::Array1;
use num_complex::Complex64;
use ringpert_geometry::discretise::circle_fraction;
use ringpert_geometry::{PolarPoint, Region, Symmetry};

use self::grid::RadialGrid;
use super::source::GaussianPulse;
use super::{FieldSolver, RunRequest, SimulationHandle, SolverError};
use crate::types::{FieldComponent, Polarization, Probe, TimeSeries};

/// Angular samples used to intersect energy regions with circles.
const ANGULAR_SAMPLES: usize = 256;

/// FDTD solver for azimuthally symmetric cells.
#[derive(Debug, Clone)]
pub struct CylindricalFdtd {
    /// Abort the run if any field magnitude exceeds this.
    pub divergence_limit: f64,
    /// Steps between divergence checks.
    pub check_interval: usize,
}

impl Default for CylindricalFdtd {
    fn default() -> Self {
        Self {
            divergence_limit: 1e12,
            check_interval: 1000,
        }
    }
}

impl FieldSolver for CylindricalFdtd {
    fn run(&self, request: &RunRequest<'_>) -> Result<Box<dyn SimulationHandle>, SolverError> {
        request.validate()?;
        let m = match request.geometry.symmetry() {
            Symmetry::Azimuthal { m } => m,
            other => {
                return Err(SolverError::Unsupported(format!(
                    "{other:?} symmetry needs a 2D Cartesian grid; the FDTD solver only runs cylindrical cells"
                )))
            }
        };
        absorber::validate(&request.config.absorber)?;

        let grid = RadialGrid::assemble(request.geometry, request.config)?;
        let dt = request.config.courant * grid.spacing / (1.0 + (m as f64).powi(2)).sqrt();
        let polarization = request.config.polarization;
        let stepper = Stepper::new(&grid, polarization, dt);

        let mut sim = CylindricalSimulation::new(grid, polarization, m, dt);
        let sources = request
            .excitation
            .sources
            .iter()
            .map(|s| sim.inject_at(s.component, &s.position, s.amplitude))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(probe) = &request.probe {
            sim.sample_field(probe.component, &probe.position)?;
        }

        let pulse = GaussianPulse::new(&request.excitation.band);
        let total_time = pulse.end_time() + request.run_time;
        let steps = (total_time / dt).ceil() as usize;
        debug!(
            "FDTD run: {} cells, m={}, dt={:.4e}, {} steps ({} polarization)",
            sim.grid.cells, m, dt, steps, polarization
        );

        let mut recorder = request.probe.map(|probe| Recorder::new(probe, dt, steps));
        let check_interval = self.check_interval.max(1);
        for step in 1..=steps {
            sim.step(&stepper, &sources, &pulse);
            if let Some(rec) = recorder.as_mut() {
                if sim.time >= pulse.end_time() {
                    let value = sim.sample_field(rec.probe.component, &rec.probe.position)?;
                    rec.push(sim.time, value.re);
                }
            }
            if step % check_interval == 0 || step == steps {
                sim.check_divergence(self.divergence_limit)?;
            }
        }

        sim.series = recorder.map(|rec| rec.series);
        Ok(Box::new(sim))
    }

    fn method_name(&self) -> &str {
        "Cylindrical FDTD"
    }
}

/// Per-array update coefficients.
struct Coefficients {
    decay: Array1<f64>,
    gain: Array1<f64>,
}

impl Coefficients {
    fn new(sigma: &Array1<f64>, material: &Array1<f64>, dt: f64) -> Self {
        let (decay, gain) = absorber::update_coefficients(sigma, material, dt);
        Self { decay, gain }
    }
}

struct Stepper {
    scalar: Coefficients,
    radial: Coefficients,
    azimuthal: Coefficients,
}

impl Stepper {
    fn new(grid: &RadialGrid, polarization: Polarization, dt: f64) -> Self {
        let vacuum_half = Array1::ones(grid.cells);
        let vacuum_integer = Array1::ones(grid.cells + 1);
        match polarization {
            Polarization::Ez => Self {
                scalar: Coefficients::new(&grid.sigma_half, &grid.eps_parallel, dt),
                radial: Coefficients::new(&grid.sigma_half, &vacuum_half, dt),
                azimuthal: Coefficients::new(&grid.sigma_integer, &vacuum_integer, dt),
            },
            Polarization::Hz => Self {
                scalar: Coefficients::new(&grid.sigma_half, &vacuum_half, dt),
                radial: Coefficients::new(&grid.sigma_half, &grid.eps_normal, dt),
                azimuthal: Coefficients::new(&grid.sigma_integer, &grid.eps_integer, dt),
            },
        }
    }
}

/// Which staggered array a component lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Scalar,
    Radial,
    Azimuthal,
}

/// A source resolved onto a grid index.
#[derive(Debug, Clone, Copy)]
struct GridSource {
    slot: Slot,
    index: usize,
    amplitude: Complex64,
}

struct Recorder {
    probe: Probe,
    series: TimeSeries,
}

impl Recorder {
    fn new(probe: Probe, dt: f64, capacity: usize) -> Self {
        Self {
            probe,
            series: TimeSeries {
                dt,
                start_time: 0.0,
                samples: Vec::with_capacity(capacity),
            },
        }
    }

    fn push(&mut self, time: f64, value: f64) {
        if self.series.samples.is_empty() {
            self.series.start_time = time;
        }
        self.series.samples.push(value);
    }
}

/// Field state of one cylindrical FDTD run.
pub struct CylindricalSimulation {
    grid: RadialGrid,
    polarization: Polarization,
    m: i32,
    dt: f64,
    time: f64,
    psi: Array1<Complex64>,
    radial: Array1<Complex64>,
    azimuthal: Array1<Complex64>,
    series: Option<TimeSeries>,
}

impl CylindricalSimulation {
    fn new(grid: RadialGrid, polarization: Polarization, m: i32, dt: f64) -> Self {
        let zero = Complex64::new(0.0, 0.0);
        Self {
            psi: Array1::from_elem(grid.cells, zero),
            radial: Array1::from_elem(grid.cells, zero),
            azimuthal: Array1::from_elem(grid.cells + 1, zero),
            grid,
            polarization,
            m,
            dt,
            time: 0.0,
            series: None,
        }
    }

    /// Map a polar component onto a staggered array and its sign.
    fn slot(&self, component: FieldComponent) -> Option<(Slot, f64)> {
        use FieldComponent::*;
        match (self.polarization, component) {
            (Polarization::Ez, Ez) => Some((Slot::Scalar, 1.0)),
            (Polarization::Ez, Hr) => Some((Slot::Radial, 1.0)),
            (Polarization::Ez, Hp) => Some((Slot::Azimuthal, 1.0)),
            (Polarization::Hz, Hz) => Some((Slot::Scalar, 1.0)),
            (Polarization::Hz, Er) => Some((Slot::Radial, -1.0)),
            (Polarization::Hz, Ep) => Some((Slot::Azimuthal, -1.0)),
            _ => None,
        }
    }

    fn inject_at(
        &self,
        component: FieldComponent,
        position: &PolarPoint,
        amplitude: Complex64,
    ) -> Result<GridSource, SolverError> {
        self.check_inside(position)?;
        let (slot, sign) = self.slot(component).ok_or_else(|| {
            SolverError::Unsupported(format!(
                "{component:?} source in a cylindrical {} cell",
                self.polarization
            ))
        })?;
        let index = match slot {
            Slot::Scalar | Slot::Radial => self.grid.half_index(position.radius),
            Slot::Azimuthal => self.grid.integer_index(position.radius),
        };
        // the e^{imφ} projection of a point source at angle φ0
        let phase = Complex64::from_polar(1.0, -(self.m as f64) * position.angle);
        Ok(GridSource {
            slot,
            index,
            amplitude: amplitude * phase * sign,
        })
    }

    fn check_inside(&self, point: &PolarPoint) -> Result<(), SolverError> {
        let extent = self.grid.extent();
        if point.radius.is_finite() && point.radius >= 0.0 && point.radius <= extent {
            Ok(())
        } else {
            Err(SolverError::OutsideDomain {
                radius: point.radius,
                extent,
            })
        }
    }

    /// Advance all fields by one time step.
    fn step(&mut self, stepper: &Stepper, sources: &[GridSource], pulse: &GaussianPulse) {
        let n = self.grid.cells;
        let dr = self.grid.spacing;
        let im = Complex64::new(0.0, self.m as f64);
        let zero = Complex64::new(0.0, 0.0);

        for i in 0..n {
            let r = self.grid.half_radius(i);
            let curl = -(im / r) * self.psi[i];
            self.radial[i] =
                self.radial[i] * stepper.radial.decay[i] + curl * stepper.radial.gain[i];
        }
        for j in 1..=n {
            let outer = if j < n { self.psi[j] } else { zero };
            let curl = (outer - self.psi[j - 1]) / dr;
            self.azimuthal[j] =
                self.azimuthal[j] * stepper.azimuthal.decay[j] + curl * stepper.azimuthal.gain[j];
        }

        let drive = pulse.value(self.time);
        for src in sources {
            match src.slot {
                Slot::Radial => {
                    self.radial[src.index] += src.amplitude * drive * stepper.radial.gain[src.index]
                }
                Slot::Azimuthal => {
                    self.azimuthal[src.index] +=
                        src.amplitude * drive * stepper.azimuthal.gain[src.index]
                }
                Slot::Scalar => {}
            }
        }

        for i in 0..n {
            let r = self.grid.half_radius(i);
            let r_in = self.grid.integer_radius(i);
            let r_out = self.grid.integer_radius(i + 1);
            let curl = (self.azimuthal[i + 1] * r_out - self.azimuthal[i] * r_in) / (r * dr)
                - (im / r) * self.radial[i];
            self.psi[i] = self.psi[i] * stepper.scalar.decay[i] + curl * stepper.scalar.gain[i];
        }

        let drive = pulse.value(self.time + 0.5 * self.dt);
        for src in sources.iter().filter(|s| s.slot == Slot::Scalar) {
            self.psi[src.index] += src.amplitude * drive * stepper.scalar.gain[src.index];
        }

        self.time += self.dt;
    }

    fn check_divergence(&self, limit: f64) -> Result<(), SolverError> {
        let magnitude = self
            .psi
            .iter()
            .chain(self.radial.iter())
            .chain(self.azimuthal.iter())
            .map(|v| v.norm())
            .fold(0.0_f64, |acc, v| if v.is_nan() { f64::INFINITY } else { acc.max(v) });
        if magnitude > limit || !magnitude.is_finite() {
            return Err(SolverError::Diverged {
                time: self.time,
                magnitude,
            });
        }
        Ok(())
    }

    /// Radial profile of a polar component at `r` (zero if the polarization
    /// does not carry it).
    fn radial_value(&self, component: FieldComponent, r: f64) -> Complex64 {
        match self.slot(component) {
            Some((Slot::Scalar, sign)) => self.grid.interpolate_half(&self.psi, r) * sign,
            Some((Slot::Radial, sign)) => self.grid.interpolate_half(&self.radial, r) * sign,
            Some((Slot::Azimuthal, sign)) => {
                self.grid.interpolate_integer(&self.azimuthal, r) * sign
            }
            None => Complex64::new(0.0, 0.0),
        }
    }

    /// Energy in one shell of width $\Delta$ at radius `r`.
    fn shell(&self, region: &Region, r: f64) -> f64 {
        2.0 * PI * r * self.grid.spacing * circle_fraction(region, r, ANGULAR_SAMPLES)
    }
}

impl SimulationHandle for CylindricalSimulation {
    fn sample_field(
        &self,
        component: FieldComponent,
        point: &PolarPoint,
    ) -> Result<Complex64, SolverError> {
        use FieldComponent::*;
        self.check_inside(point)?;
        let r = point.radius;
        let (sin, cos) = point.angle.sin_cos();
        let value = match component {
            Ex => self.radial_value(Er, r) * cos - self.radial_value(Ep, r) * sin,
            Ey => self.radial_value(Er, r) * sin + self.radial_value(Ep, r) * cos,
            Hx => self.radial_value(Hr, r) * cos - self.radial_value(Hp, r) * sin,
            Hy => self.radial_value(Hr, r) * sin + self.radial_value(Hp, r) * cos,
            polar => self.radial_value(polar, r),
        };
        Ok(value * Complex64::from_polar(1.0, self.m as f64 * point.angle))
    }

    fn field_energy(&self, region: &Region) -> Result<f64, SolverError> {
        region.validate()?;
        let grid = &self.grid;
        let energy = match self.polarization {
            Polarization::Ez => (0..grid.cells)
                .map(|i| {
                    0.5 * grid.eps_parallel[i]
                        * self.psi[i].norm_sqr()
                        * self.shell(region, grid.half_radius(i))
                })
                .sum::<f64>(),
            Polarization::Hz => {
                let radial: f64 = (0..grid.cells)
                    .map(|i| {
                        0.5 * grid.eps_normal[i]
                            * self.radial[i].norm_sqr()
                            * self.shell(region, grid.half_radius(i))
                    })
                    .sum();
                let azimuthal: f64 = (1..=grid.cells)
                    .map(|j| {
                        0.5 * grid.eps_integer[j]
                            * self.azimuthal[j].norm_sqr()
                            * self.shell(region, grid.integer_radius(j))
                    })
                    .sum();
                radial + azimuthal
            }
        };
        Ok(energy)
    }

    fn time_series(&self) -> Option<&TimeSeries> {
        self.series.as_ref()
    }

    fn elapsed_time(&self) -> f64 {
        self.time
    }
}
