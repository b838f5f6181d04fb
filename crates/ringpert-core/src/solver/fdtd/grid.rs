//! Staggered radial grid and material arrays.
//!
//! With spacing $\Delta$ and $N$ cells:
//!
//! - the out-of-plane component $\psi$ and the radial component $u_r$ live at
//!   half-integer radii $r_{i+1/2} = (i + \tfrac12)\Delta$, $i = 0 \dots N-1$;
//! - the azimuthal component $u_\phi$ lives at integer radii $r_j = j\Delta$,
//!   $j = 0 \dots N$.
//!
//! $\psi$ is zero beyond $r_N$ (a closed wall behind the absorber).

use ndarray::Array1;
use num_complex::Complex64;
use ringpert_geometry::discretise::{averaged_permittivity, Averaging};
use ringpert_geometry::RingGeometry;

use super::absorber;
use crate::solver::SolverError;
use crate::types::SimulationConfig;

/// Upper bound on the number of radial cells in one run.
const MAX_CELLS: usize = 4_000_000;

#[derive(Debug, Clone)]
pub(crate) struct RadialGrid {
    pub cells: usize,
    pub spacing: f64,
    /// $\epsilon$ at half-integer radii, arithmetic average over the cell.
    pub eps_parallel: Array1<f64>,
    /// $\epsilon$ at half-integer radii, harmonic average over the cell.
    pub eps_normal: Array1<f64>,
    /// $\epsilon$ at integer radii, arithmetic average over the dual cell.
    pub eps_integer: Array1<f64>,
    pub sigma_half: Array1<f64>,
    pub sigma_integer: Array1<f64>,
}

impl RadialGrid {
    pub fn assemble(geometry: &RingGeometry, config: &SimulationConfig) -> Result<Self, SolverError> {
        let spacing = config.grid_spacing();
        let cells_f = (config.domain_extent / spacing).ceil();
        if !cells_f.is_finite() || cells_f < 4.0 || cells_f > MAX_CELLS as f64 {
            return Err(SolverError::InvalidConfig(format!(
                "resolution {} gives {} radial cells (allowed 4..={})",
                config.resolution, cells_f, MAX_CELLS
            )));
        }
        let cells = cells_f as usize;

        let start = geometry.absorber_start();
        let thickness = geometry.absorber_thickness();
        let spec = &config.absorber;

        let eps_parallel = Array1::from_shape_fn(cells, |i| {
            let lo = i as f64 * spacing;
            averaged_permittivity(geometry, lo, lo + spacing, Averaging::Arithmetic)
        });
        let eps_normal = Array1::from_shape_fn(cells, |i| {
            let lo = i as f64 * spacing;
            averaged_permittivity(geometry, lo, lo + spacing, Averaging::Harmonic)
        });
        let eps_integer = Array1::from_shape_fn(cells + 1, |j| {
            let r = j as f64 * spacing;
            let lo = (r - 0.5 * spacing).max(0.0);
            averaged_permittivity(geometry, lo, r + 0.5 * spacing, Averaging::Arithmetic)
        });
        let sigma_half = Array1::from_shape_fn(cells, |i| {
            absorber::conductivity(spec, start, thickness, (i as f64 + 0.5) * spacing)
        });
        let sigma_integer = Array1::from_shape_fn(cells + 1, |j| {
            absorber::conductivity(spec, start, thickness, j as f64 * spacing)
        });

        Ok(Self {
            cells,
            spacing,
            eps_parallel,
            eps_normal,
            eps_integer,
            sigma_half,
            sigma_integer,
        })
    }

    pub fn half_radius(&self, i: usize) -> f64 {
        (i as f64 + 0.5) * self.spacing
    }

    pub fn integer_radius(&self, j: usize) -> f64 {
        j as f64 * self.spacing
    }

    /// Outer radius of the grid, $N\Delta$.
    pub fn extent(&self) -> f64 {
        self.cells as f64 * self.spacing
    }

    /// Index of the half-integer point whose cell contains `r`.
    pub fn half_index(&self, r: f64) -> usize {
        ((r / self.spacing).floor().max(0.0) as usize).min(self.cells - 1)
    }

    /// Index of the integer point nearest to `r`, excluding the axis.
    pub fn integer_index(&self, r: f64) -> usize {
        ((r / self.spacing).round().max(1.0) as usize).min(self.cells)
    }

    /// Linear interpolation of a half-integer array at radius `r`.
    pub fn interpolate_half(&self, values: &Array1<Complex64>, r: f64) -> Complex64 {
        let s = r / self.spacing - 0.5;
        if s <= 0.0 {
            return values[0];
        }
        let i0 = s.floor() as usize;
        if i0 + 1 >= self.cells {
            return values[self.cells - 1];
        }
        let t = s - i0 as f64;
        values[i0] * (1.0 - t) + values[i0 + 1] * t
    }

    /// Linear interpolation of an integer array at radius `r`.
    pub fn interpolate_integer(&self, values: &Array1<Complex64>, r: f64) -> Complex64 {
        let s = (r / self.spacing).max(0.0);
        let j0 = s.floor() as usize;
        if j0 >= self.cells {
            return values[self.cells];
        }
        let t = s - j0 as f64;
        values[j0] * (1.0 - t) + values[j0 + 1] * t
    }
}
