//! Graded conductivity absorber.
//!
//! The layer occupies $r_0 \le r \le r_0 + d$. Its conductivity grows as
//!
//! $$\sigma(r) = \sigma_\max \left(\frac{r - r_0}{d}\right)^p, \qquad
//!   \sigma_\max = -\frac{(p + 1) \ln R}{2 d}$$
//!
//! which gives a normal-incidence round-trip reflection of about $R$. The
//! magnetic conductivity is matched ($\sigma^* / \mu = \sigma / \epsilon$) so
//! the layer is impedance-matched to vacuum.

use ndarray::Array1;

use crate::solver::SolverError;
use crate::types::AbsorberSpec;

/// Check that a spec describes a physical absorber.
pub(crate) fn validate(spec: &AbsorberSpec) -> Result<(), SolverError> {
    if !(spec.reflection > 0.0 && spec.reflection < 1.0) {
        return Err(SolverError::InvalidConfig(format!(
            "absorber reflection must lie in (0, 1), got {}",
            spec.reflection
        )));
    }
    if !(spec.profile_order.is_finite() && spec.profile_order >= 0.0) {
        return Err(SolverError::InvalidConfig(format!(
            "absorber profile order must be non-negative, got {}",
            spec.profile_order
        )));
    }
    Ok(())
}

pub(crate) fn peak_conductivity(spec: &AbsorberSpec, thickness: f64) -> f64 {
    -(spec.profile_order + 1.0) * spec.reflection.ln() / (2.0 * thickness)
}

/// Conductivity at radius `r` for a layer starting at `start`.
pub(crate) fn conductivity(spec: &AbsorberSpec, start: f64, thickness: f64, r: f64) -> f64 {
    if r <= start {
        return 0.0;
    }
    let depth = ((r - start) / thickness).min(1.0);
    peak_conductivity(spec, thickness) * depth.powf(spec.profile_order)
}

/// Semi-implicit update coefficients for $\epsilon\,\partial_t u + \sigma u = \text{curl}$.
///
/// Returns `(decay, gain)` with
/// $u^{n+1} = \text{decay}\,u^n + \text{gain}\,\text{curl}^{n+1/2}$.
pub(crate) fn update_coefficients(
    sigma: &Array1<f64>,
    material: &Array1<f64>,
    dt: f64,
) -> (Array1<f64>, Array1<f64>) {
    let loss = sigma * (0.5 * dt) / material;
    let decay = (1.0 - &loss) / (1.0 + &loss);
    let gain = (dt / material) / (1.0 + &loss);
    (decay, gain)
}
