//! First-order perturbation estimate for a moving outer wall.
//!
//! Growing the outer radius by $dR$ shifts the resonance by approximately
//!
//! $$\frac{d\omega}{dR} = -\frac{f}{4}\,\frac{S}{U}$$
//!
//! where $f$ is the unperturbed frequency, $S = 2\pi b\,\langle|E_\parallel|\rangle$
//! is the wall integral from [`FieldSampler`](crate::sampler::FieldSampler)
//! and $U$ the stored electric energy. The prediction for a perturbation
//! $dr$ is $f + (d\omega/dR)\,dr$, in the solver's frequency units.

use serde::Serialize;

use crate::error::StudyError;
use crate::types::{ResonanceMode, SurfaceIntegral, VolumeIntegral};

/// Predicted frequency slope and the integrals it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerturbationEstimate {
    pub baseline_frequency: f64,
    pub numerator: f64,
    pub denominator: f64,
    /// $d\omega/dR$.
    pub dw_dr: f64,
}

impl PerturbationEstimate {
    pub fn new(
        mode: &ResonanceMode,
        numerator: SurfaceIntegral,
        denominator: VolumeIntegral,
    ) -> Result<Self, StudyError> {
        Ok(Self {
            baseline_frequency: mode.frequency,
            numerator: numerator.0,
            denominator: denominator.0,
            dw_dr: predict_dw_dr(mode, numerator, denominator)?,
        })
    }

    /// Predicted frequency after moving the outer wall by `dr`.
    pub fn predict(&self, dr: f64) -> f64 {
        predict_frequency(self.baseline_frequency, self.dw_dr, dr)
    }
}

/// $d\omega/dR = -f \cdot \text{numerator} / (4 \cdot \text{denominator})$.
///
/// A zero, negative or non-finite denominator means the steady-state run
/// stored no energy; that is reported instead of producing a NaN slope.
pub fn predict_dw_dr(
    mode: &ResonanceMode,
    numerator: SurfaceIntegral,
    denominator: VolumeIntegral,
) -> Result<f64, StudyError> {
    let VolumeIntegral(den) = denominator;
    let SurfaceIntegral(num) = numerator;
    if !(den.is_finite() && den > 0.0) {
        return Err(StudyError::DegenerateComparison(format!(
            "stored energy must be positive, got {den}"
        )));
    }
    if !(num.is_finite() && mode.frequency.is_finite()) {
        return Err(StudyError::DegenerateComparison(format!(
            "non-finite perturbation inputs (f={}, surface={num})",
            mode.frequency
        )));
    }
    Ok(-mode.frequency * num / (4.0 * den))
}

/// First-order prediction $f + (d\omega/dR)\,dr$.
pub fn predict_frequency(baseline_frequency: f64, dw_dr: f64, dr: f64) -> f64 {
    baseline_frequency + dw_dr * dr
}
