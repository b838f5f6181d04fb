//! Discretisation helpers: boundary circles, radial permittivity, region
//! coverage.
//!
//! Boundary circles are sampled at equally spaced angles. Radial grid cells
//! get a permittivity averaged over the part of the cell covered by the ring,
//! so the discrete structure changes continuously with the ring radii (a
//! sub-cell shift of the outer wall still moves the resonance).

use std::f64::consts::PI;

use crate::primitives::{PolarPoint, Region, RingGeometry};

/// How permittivity is averaged across a cell that straddles an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Averaging {
    /// $\langle\epsilon\rangle$, for field components parallel to the interface.
    Arithmetic,
    /// $\langle\epsilon^{-1}\rangle^{-1}$, for components normal to the interface.
    Harmonic,
}

/// `count` equally spaced points on a circle, starting on the +x axis.
pub fn circle_points(radius: f64, count: usize) -> Vec<PolarPoint> {
    (0..count)
        .map(|k| PolarPoint::new(radius, 2.0 * PI * k as f64 / count as f64))
        .collect()
}

/// Fraction of the radial interval `[r_lo, r_hi]` occupied by the ring.
pub fn fill_fraction(ring: &RingGeometry, r_lo: f64, r_hi: f64) -> f64 {
    let span = r_hi - r_lo;
    if span <= 0.0 {
        return if ring.contains_radius(r_lo) { 1.0 } else { 0.0 };
    }
    let lo = r_lo.max(ring.inner_radius());
    let hi = r_hi.min(ring.outer_radius());
    ((hi - lo) / span).clamp(0.0, 1.0)
}

/// Permittivity of a radial cell `[r_lo, r_hi]`, averaged over the cell.
pub fn averaged_permittivity(
    ring: &RingGeometry,
    r_lo: f64,
    r_hi: f64,
    averaging: Averaging,
) -> f64 {
    let f = fill_fraction(ring, r_lo, r_hi);
    let eps = ring.permittivity();
    match averaging {
        Averaging::Arithmetic => 1.0 + (eps - 1.0) * f,
        Averaging::Harmonic => 1.0 / (f / eps + (1.0 - f)),
    }
}

/// Fraction of the circle of radius `radius` lying inside `region`.
///
/// Annuli are exact. Rectangles are evaluated at `samples` midpoint angles.
pub fn circle_fraction(region: &Region, radius: f64, samples: usize) -> f64 {
    match region {
        Region::Annulus { inner, outer } => {
            if radius >= *inner && radius <= *outer {
                1.0
            } else {
                0.0
            }
        }
        Region::Rect { .. } => {
            let (lo, hi) = region.radial_bounds();
            if radius < lo || radius > hi || samples == 0 {
                return 0.0;
            }
            let inside = (0..samples)
                .filter(|&k| {
                    let angle = 2.0 * PI * (k as f64 + 0.5) / samples as f64;
                    region.contains(&PolarPoint::new(radius, angle))
                })
                .count();
            inside as f64 / samples as f64
        }
    }
}
