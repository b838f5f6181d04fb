//! Parametric ring geometry and measurement regions.
//!
//! The resonator is a dielectric annulus $a \le r \le b$ of refractive index
//! $n$ centred on the origin, surrounded by `padding` of air and an absorbing
//! layer of thickness `absorber_thickness`. Lengths are in the solver's
//! dimensionless units (frequencies are then in units of $c$ / length).

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::GeometryError;

/// Distance of the excitation/observation point outside the inner radius.
const PROBE_OFFSET: f64 = 0.1;

/// Symmetry used to reduce the simulation cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Symmetry {
    /// Cylindrical reduction: fields vary as $e^{im\phi}$ and only the
    /// radial direction is discretised.
    Azimuthal { m: i32 },
    /// Full 2D Cartesian cell with a mirror plane at $y = 0$.
    MirrorY,
    /// Full 2D Cartesian cell.
    None,
}

/// How the cell is discretised, derived from the [`Symmetry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimensionality {
    /// Radial grid $0 \le r \le s_r$ with an analytic azimuthal dependence.
    Cylindrical,
    /// Square $s_{xy} \times s_{xy}$ cell centred on the ring.
    Cartesian2D,
}

impl Symmetry {
    pub fn dimensionality(&self) -> Dimensionality {
        match self {
            Symmetry::Azimuthal { .. } => Dimensionality::Cylindrical,
            Symmetry::MirrorY | Symmetry::None => Dimensionality::Cartesian2D,
        }
    }

    /// Azimuthal order $m$, if the cell is cylindrically reduced.
    pub fn azimuthal_order(&self) -> Option<i32> {
        match self {
            Symmetry::Azimuthal { m } => Some(*m),
            _ => None,
        }
    }
}

/// A point in the structure plane, in polar coordinates about the ring centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    /// Distance from the ring centre.
    pub radius: f64,
    /// Angle from the +x axis (radians).
    pub angle: f64,
}

impl PolarPoint {
    pub fn new(radius: f64, angle: f64) -> Self {
        Self { radius, angle }
    }

    pub fn from_cartesian(x: f64, y: f64) -> Self {
        Self {
            radius: x.hypot(y),
            angle: y.atan2(x),
        }
    }

    pub fn to_cartesian(&self) -> [f64; 2] {
        [
            self.radius * self.angle.cos(),
            self.radius * self.angle.sin(),
        ]
    }
}

/// A dielectric ring resonator in an absorber-terminated cell.
///
/// Fields are private so the invariants checked by [`RingGeometry::new`]
/// ($b > a > 0$, $n > 1$, non-negative padding, positive absorber) hold for
/// every value in circulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingGeometry {
    inner_radius: f64,
    width: f64,
    index: f64,
    padding: f64,
    absorber_thickness: f64,
    symmetry: Symmetry,
}

impl RingGeometry {
    /// Construct a ring, validating every parameter.
    ///
    /// # Arguments
    /// * `inner_radius` - Inner radius $a$.
    /// * `width` - Waveguide width $w$, so the outer radius is $b = a + w$.
    /// * `index` - Refractive index $n$ of the ring.
    /// * `padding` - Air gap between the ring and the absorber.
    /// * `absorber_thickness` - Thickness of the absorbing layer.
    /// * `symmetry` - Cell reduction.
    pub fn new(
        inner_radius: f64,
        width: f64,
        index: f64,
        padding: f64,
        absorber_thickness: f64,
        symmetry: Symmetry,
    ) -> Result<Self, GeometryError> {
        check(inner_radius, inner_radius > 0.0, "inner_radius", "positive and finite")?;
        check(width, width > 0.0, "width", "positive and finite")?;
        check(index, index > 1.0, "index", "greater than 1")?;
        check(padding, padding >= 0.0, "padding", "non-negative")?;
        check(
            absorber_thickness,
            absorber_thickness > 0.0,
            "absorber_thickness",
            "positive and finite",
        )?;

        Ok(Self {
            inner_radius,
            width,
            index,
            padding,
            absorber_thickness,
            symmetry,
        })
    }

    pub fn inner_radius(&self) -> f64 {
        self.inner_radius
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Outer radius $b = a + w$.
    pub fn outer_radius(&self) -> f64 {
        self.inner_radius + self.width
    }

    pub fn index(&self) -> f64 {
        self.index
    }

    /// Relative permittivity $\epsilon = n^2$ of the ring material.
    pub fn permittivity(&self) -> f64 {
        self.index * self.index
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    pub fn absorber_thickness(&self) -> f64 {
        self.absorber_thickness
    }

    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }

    pub fn dimensionality(&self) -> Dimensionality {
        self.symmetry.dimensionality()
    }

    /// Whether a radius lies inside the dielectric.
    pub fn contains_radius(&self, radius: f64) -> bool {
        radius >= self.inner_radius && radius <= self.outer_radius()
    }

    /// A new ring whose outer radius is moved out by `dr` (the width grows,
    /// the inner radius is unchanged).
    pub fn with_outer_radius_shift(&self, dr: f64) -> Result<Self, GeometryError> {
        Self::new(
            self.inner_radius,
            self.width + dr,
            self.index,
            self.padding,
            self.absorber_thickness,
            self.symmetry,
        )
    }

    /// Radius at which the absorber starts.
    pub fn absorber_start(&self) -> f64 {
        self.outer_radius() + self.padding
    }

    /// Size of the simulation cell.
    ///
    /// Cylindrical cells span $0 \le r \le b + \text{pad} + d_\text{abs}$;
    /// Cartesian cells are squares of side $2(b + \text{pad} + d_\text{abs})$.
    pub fn domain_extent(&self) -> f64 {
        let radial = self.absorber_start() + self.absorber_thickness;
        match self.dimensionality() {
            Dimensionality::Cylindrical => radial,
            Dimensionality::Cartesian2D => 2.0 * radial,
        }
    }

    /// Point just outside the inner wall where the source sits and where the
    /// ring-down signal is recorded.
    pub fn probe_point(&self) -> PolarPoint {
        PolarPoint::new(self.inner_radius + PROBE_OFFSET, 0.0)
    }

    /// Region whose stored electric energy normalises the perturbation
    /// formula: everything within $b + \text{pad}/2$ of the centre.
    pub fn energy_reference_region(&self) -> Region {
        let reach = self.outer_radius() + 0.5 * self.padding;
        match self.dimensionality() {
            Dimensionality::Cylindrical => Region::Annulus {
                inner: 0.0,
                outer: reach,
            },
            Dimensionality::Cartesian2D => Region::Rect {
                centre: [0.0, 0.0],
                size: [2.0 * reach, 2.0 * reach],
            },
        }
    }

    /// Circumference of the outer wall, $2\pi b$.
    pub fn outer_circumference(&self) -> f64 {
        2.0 * PI * self.outer_radius()
    }
}

impl fmt::Display for RingGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ring a={}, b={}, n={}",
            self.inner_radius,
            self.outer_radius(),
            self.index
        )?;
        match self.symmetry {
            Symmetry::Azimuthal { m } => write!(f, " (m={m})"),
            Symmetry::MirrorY => write!(f, " (mirror y)"),
            Symmetry::None => Ok(()),
        }
    }
}

fn check(
    value: f64,
    ok: bool,
    name: &'static str,
    requirement: &'static str,
) -> Result<(), GeometryError> {
    if value.is_finite() && ok {
        Ok(())
    } else {
        Err(GeometryError::OutOfRange {
            name,
            requirement,
            value,
        })
    }
}

/// A region of the structure plane over which field energy is integrated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Region {
    /// Annulus `inner <= r <= outer` about the ring centre.
    Annulus { inner: f64, outer: f64 },
    /// Axis-aligned rectangle.
    Rect { centre: [f64; 2], size: [f64; 2] },
}

impl Region {
    /// Reject regions with negative or inverted extents.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Region::Annulus { inner, outer } => {
                if !(inner.is_finite() && outer.is_finite() && *inner >= 0.0 && outer > inner) {
                    return Err(GeometryError::InvalidRegion(format!(
                        "annulus needs 0 <= inner < outer, got [{inner}, {outer}]"
                    )));
                }
            }
            Region::Rect { centre, size } => {
                let finite = centre.iter().chain(size.iter()).all(|v| v.is_finite());
                if !finite || size[0] <= 0.0 || size[1] <= 0.0 {
                    return Err(GeometryError::InvalidRegion(format!(
                        "rectangle needs a positive finite size, got {size:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check whether a point lies inside this region.
    pub fn contains(&self, point: &PolarPoint) -> bool {
        match self {
            Region::Annulus { inner, outer } => point.radius >= *inner && point.radius <= *outer,
            Region::Rect { centre, size } => {
                let [x, y] = point.to_cartesian();
                (x - centre[0]).abs() <= 0.5 * size[0] && (y - centre[1]).abs() <= 0.5 * size[1]
            }
        }
    }

    /// Smallest and largest radius at which a circle can meet the region.
    pub fn radial_bounds(&self) -> (f64, f64) {
        match self {
            Region::Annulus { inner, outer } => (*inner, *outer),
            Region::Rect { centre, size } => {
                let hx = 0.5 * size[0];
                let hy = 0.5 * size[1];
                // nearest point of the rectangle to the origin
                let nx = (0.0_f64).clamp(centre[0] - hx, centre[0] + hx);
                let ny = (0.0_f64).clamp(centre[1] - hy, centre[1] + hy);
                let far_x = centre[0].abs() + hx;
                let far_y = centre[1].abs() + hy;
                (nx.hypot(ny), far_x.hypot(far_y))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_ring() -> RingGeometry {
        RingGeometry::new(1.0, 1.0, 3.4, 4.0, 2.0, Symmetry::Azimuthal { m: 4 }).unwrap()
    }

    #[test]
    fn test_derived_radii_and_extent() {
        let ring = reference_ring();
        assert_eq!(ring.outer_radius(), 2.0);
        assert_eq!(ring.absorber_start(), 6.0);
        assert_eq!(ring.domain_extent(), 8.0);
        assert!((ring.permittivity() - 11.56).abs() < 1e-12);

        let planar =
            RingGeometry::new(1.0, 1.0, 3.4, 4.0, 2.0, Symmetry::MirrorY).unwrap();
        assert_eq!(planar.domain_extent(), 16.0);
        assert_eq!(planar.dimensionality(), Dimensionality::Cartesian2D);
    }

    #[test]
    fn test_invariants_rejected() {
        let sym = Symmetry::None;
        assert!(RingGeometry::new(0.0, 1.0, 3.4, 4.0, 2.0, sym).is_err());
        assert!(RingGeometry::new(1.0, -0.5, 3.4, 4.0, 2.0, sym).is_err());
        assert!(RingGeometry::new(1.0, 1.0, 1.0, 4.0, 2.0, sym).is_err());
        assert!(RingGeometry::new(1.0, 1.0, 3.4, -1.0, 2.0, sym).is_err());
        assert!(RingGeometry::new(1.0, 1.0, 3.4, 4.0, 0.0, sym).is_err());
        assert!(RingGeometry::new(f64::NAN, 1.0, 3.4, 4.0, 2.0, sym).is_err());
    }

    #[test]
    fn test_perturbation_returns_new_value() {
        let ring = reference_ring();
        let grown = ring.with_outer_radius_shift(0.01).unwrap();
        assert_eq!(ring.outer_radius(), 2.0);
        assert!((grown.outer_radius() - 2.01).abs() < 1e-12);
        assert_eq!(grown.inner_radius(), ring.inner_radius());
        assert!(ring.with_outer_radius_shift(-1.0).is_err());
    }

    #[test]
    fn test_rect_contains_and_bounds() {
        let rect = Region::Rect {
            centre: [0.0, 0.0],
            size: [4.0, 4.0],
        };
        assert!(rect.contains(&PolarPoint::new(1.9, 0.0)));
        assert!(rect.contains(&PolarPoint::new(2.5, std::f64::consts::FRAC_PI_4)));
        assert!(!rect.contains(&PolarPoint::new(2.5, 0.0)));

        let (lo, hi) = rect.radial_bounds();
        assert_eq!(lo, 0.0);
        assert!((hi - 8.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_region_validation() {
        assert!(Region::Annulus { inner: 0.0, outer: 4.0 }.validate().is_ok());
        assert!(Region::Annulus { inner: 3.0, outer: 2.0 }.validate().is_err());
        assert!(Region::Rect { centre: [0.0, 0.0], size: [0.0, 1.0] }.validate().is_err());
    }
}
