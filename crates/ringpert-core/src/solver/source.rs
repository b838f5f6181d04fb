//! Gaussian pulse source waveform.
//!
//! $$s(t) = \exp\left(-\frac{(t - t_0)^2}{2\tau^2}\right) \sin(2\pi f_c (t - t_0))$$
//!
//! with $\tau = 1/(\pi\,\Delta f)$ so that the spectral amplitude falls to
//! $e^{-2}$ at $f_c \pm \Delta f$, and $t_0 = 4\tau$ so the pulse starts from
//! (numerically) zero. The source is switched off at $2 t_0$.

use std::f64::consts::PI;

use crate::types::ExcitationBand;

/// Number of widths $\tau$ between switch-on and the pulse peak.
const CUTOFF: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianPulse {
    center: f64,
    tau: f64,
}

impl GaussianPulse {
    pub fn new(band: &ExcitationBand) -> Self {
        Self {
            center: band.center,
            tau: 1.0 / (PI * band.width),
        }
    }

    /// Pulse width $\tau$.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Time of the pulse peak, $t_0$.
    pub fn peak_time(&self) -> f64 {
        CUTOFF * self.tau
    }

    /// Time after which the source is identically zero.
    pub fn end_time(&self) -> f64 {
        2.0 * self.peak_time()
    }

    /// Source amplitude at time `t`.
    pub fn value(&self, t: f64) -> f64 {
        if t < 0.0 || t > self.end_time() {
            return 0.0;
        }
        let s = t - self.peak_time();
        (-0.5 * (s / self.tau).powi(2)).exp() * (2.0 * PI * self.center * s).sin()
    }

    /// Relative spectral weight of the pulse at `frequency`, 1 at the centre.
    pub fn spectral_weight(&self, frequency: f64) -> f64 {
        let x = PI * self.tau * (frequency - self.center);
        (-2.0 * x * x).exp()
    }
}
