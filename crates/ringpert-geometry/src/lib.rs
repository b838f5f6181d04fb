//! # Ringpert Geometry
//!
//! Geometry handling for the ringpert workspace. This crate provides:
//!
//! - **Ring primitive** ([`primitives`]): the dielectric annulus, its padded
//!   and absorber-terminated cell, the symmetry used to reduce it, and the
//!   regions over which stored energy is measured.
//! - **Discretisation** ([`discretise`]): equally spaced boundary circles,
//!   sub-cell permittivity averaging on a radial grid, and the angular
//!   coverage of a region used by energy integrals.
//!
//! Every value here is immutable once constructed. A perturbed ring is a new
//! [`RingGeometry`](primitives::RingGeometry), never an in-place edit.

pub mod discretise;
pub mod primitives;

use thiserror::Error;

pub use primitives::{Dimensionality, PolarPoint, Region, RingGeometry, Symmetry};

/// Errors raised while constructing or perturbing a geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{name} must be {requirement}, got {value}")]
    OutOfRange {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("Invalid region: {0}")]
    InvalidRegion(String),
}
