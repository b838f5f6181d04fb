//! Harmonic inversion: decaying sinusoids from a ring-down signal.
//!
//! A recorded signal $x_k = \sum_j c_j z_j^k$ with $z_j = e^{(i 2\pi f_j -
//! \gamma_j)\Delta t}$ is decomposed with the matrix pencil method:
//!
//! 1. Decimate to a few samples per period of the highest band frequency.
//! 2. Form the Hankel matrix $Y_{ij} = x_{i+j}$ and truncate its SVD to the
//!    $M$ significant singular values.
//! 3. The poles $z_j$ are the eigenvalues of $V_1^{+} V_2$, where $V_1$, $V_2$
//!    are the truncated right singular vectors without their last / first
//!    row.
//! 4. Amplitudes $c_j$ follow from a least-squares Vandermonde fit.
//!
//! Only poles with positive frequency inside the excitation band and with a
//! non-negligible amplitude are reported, sorted by frequency.

use std::f64::consts::PI;

use log::debug;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use thiserror::Error;

use crate::types::{ExcitationBand, ResonanceMode, TimeSeries};

/// Errors from a harmonic inversion.
#[derive(Debug, Error)]
pub enum HarmonicError {
    #[error("Time series too short: {len} samples after decimation (need at least {min})")]
    TooShort { len: usize, min: usize },

    #[error("Invalid sampling interval: {0}")]
    InvalidSampling(f64),

    #[error("Time series contains non-finite samples")]
    NonFinite,

    #[error("Linear algebra error: {0}")]
    LinAlg(String),
}

/// Extracts resonant modes from a recorded time series.
pub trait HarmonicInversion: Send + Sync {
    /// Return the modes found inside `band`, sorted by frequency. An empty
    /// list means the signal carries no resonance in the band.
    fn extract_modes(
        &self,
        series: &TimeSeries,
        band: &ExcitationBand,
    ) -> Result<Vec<ResonanceMode>, HarmonicError>;

    /// Human-readable name of the method.
    fn method_name(&self) -> &str;
}

/// Matrix pencil harmonic inversion.
#[derive(Debug, Clone)]
pub struct MatrixPencil {
    /// Samples per period of the highest frequency kept after decimation.
    pub samples_per_period: f64,
    /// Cap on the decimated signal length.
    pub max_samples: usize,
    /// Singular values below this fraction of the largest are noise.
    pub rank_tolerance: f64,
    /// Cap on the number of poles.
    pub max_order: usize,
    /// Modes weaker than this fraction of the strongest in-band mode are dropped.
    pub amplitude_threshold: f64,
    /// Modes whose relative fit error exceeds this are dropped.
    pub max_error: f64,
}

impl Default for MatrixPencil {
    fn default() -> Self {
        Self {
            samples_per_period: 4.0,
            max_samples: 600,
            rank_tolerance: 1e-7,
            max_order: 40,
            amplitude_threshold: 1e-3,
            max_error: 0.1,
        }
    }
}

/// Shortest decimated signal the pencil will work on.
const MIN_SAMPLES: usize = 12;

impl MatrixPencil {
    /// Decimate the recording for `band`; returns the samples and their spacing.
    fn decimate(&self, series: &TimeSeries, band: &ExcitationBand) -> (Vec<f64>, f64) {
        let f_max = band.center + band.width;
        let target_dt = 1.0 / (self.samples_per_period * f_max);
        let stride = ((target_dt / series.dt).floor() as usize).max(1);
        let mut samples: Vec<f64> = series.samples.iter().step_by(stride).copied().collect();
        samples.truncate(self.max_samples);
        (samples, series.dt * stride as f64)
    }

    /// Poles of the signal and their complex amplitudes.
    fn poles(&self, x: &[f64]) -> Result<(Vec<Complex64>, Vec<Complex64>, f64), HarmonicError> {
        let n = x.len();
        let pencil = n / 3;
        let rows = n - pencil;
        let cols = pencil + 1;

        let hankel = DMatrix::from_fn(rows, cols, |i, j| x[i + j]);
        let svd = hankel.svd(false, true);
        let v_t = svd
            .v_t
            .ok_or_else(|| HarmonicError::LinAlg("SVD did not return right singular vectors".into()))?;
        let sv = svd.singular_values;

        let mut order: Vec<usize> = (0..sv.len()).collect();
        order.sort_by(|&a, &b| sv[b].total_cmp(&sv[a]));
        let largest = sv[order[0]];
        if largest == 0.0 {
            return Ok((Vec::new(), Vec::new(), 0.0));
        }
        let rank = order
            .iter()
            .take_while(|&&k| sv[k] > self.rank_tolerance * largest)
            .count()
            .min(self.max_order)
            .min(pencil);
        debug!("matrix pencil: {} samples, pencil {}, rank {}", n, pencil, rank);

        let v = DMatrix::from_fn(rank, cols, |r, c| v_t[(order[r], c)]);
        let v1 = v.columns(0, pencil).into_owned();
        let v2 = v.columns(1, pencil).into_owned();
        let v1_pinv = v1
            .transpose()
            .pseudo_inverse(1e-12)
            .map_err(|e| HarmonicError::LinAlg(e.to_string()))?;
        let system = v1_pinv * v2.transpose();
        let poles: Vec<Complex64> = system.complex_eigenvalues().iter().copied().collect();

        let vandermonde = DMatrix::from_fn(n, poles.len(), |k, j| poles[j].powu(k as u32));
        let signal = DVector::from_iterator(n, x.iter().map(|&v| Complex64::new(v, 0.0)));
        let amplitudes = vandermonde
            .clone()
            .svd(true, true)
            .solve(&signal, 1e-12)
            .map_err(|e| HarmonicError::LinAlg(e.to_string()))?;
        let residual = (&vandermonde * &amplitudes - &signal).norm() / (n as f64).sqrt();

        Ok((poles, amplitudes.iter().copied().collect(), residual))
    }
}

impl HarmonicInversion for MatrixPencil {
    fn extract_modes(
        &self,
        series: &TimeSeries,
        band: &ExcitationBand,
    ) -> Result<Vec<ResonanceMode>, HarmonicError> {
        if !(series.dt.is_finite() && series.dt > 0.0) {
            return Err(HarmonicError::InvalidSampling(series.dt));
        }
        if series.samples.iter().any(|v| !v.is_finite()) {
            return Err(HarmonicError::NonFinite);
        }

        let (mut x, dt) = self.decimate(series, band);
        if x.len() < MIN_SAMPLES {
            return Err(HarmonicError::TooShort {
                len: x.len(),
                min: MIN_SAMPLES,
            });
        }
        let scale = x.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 {
            return Ok(Vec::new());
        }
        x.iter_mut().for_each(|v| *v /= scale);

        let (poles, amplitudes, residual) = self.poles(&x)?;

        let mut modes: Vec<ResonanceMode> = poles
            .iter()
            .zip(amplitudes.iter())
            .filter(|(z, _)| z.im > 0.0)
            .map(|(z, c)| {
                let frequency = z.arg() / (2.0 * PI * dt);
                let decay_rate = -z.norm().ln() / dt;
                let magnitude = c.norm();
                ResonanceMode {
                    frequency,
                    quality_factor: if decay_rate != 0.0 {
                        PI * frequency / decay_rate
                    } else {
                        f64::INFINITY
                    },
                    decay_rate,
                    amplitude: 2.0 * magnitude * scale,
                    error: if magnitude > 0.0 { residual / magnitude } else { f64::INFINITY },
                }
            })
            .filter(|mode| band.contains(mode.frequency))
            .collect();

        let strongest = modes.iter().fold(0.0_f64, |acc, m| acc.max(m.amplitude));
        modes.retain(|m| {
            m.amplitude >= self.amplitude_threshold * strongest && m.error <= self.max_error
        });
        modes.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        Ok(modes)
    }

    fn method_name(&self) -> &str {
        "Matrix pencil"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Sum of damped cosines `(amplitude, frequency, decay)`.
    fn ring_down(modes: &[(f64, f64, f64)], dt: f64, count: usize) -> TimeSeries {
        let samples = (0..count)
            .map(|k| {
                let t = k as f64 * dt;
                modes
                    .iter()
                    .map(|&(a, f, g)| a * (-g * t).exp() * (2.0 * PI * f * t).cos())
                    .sum()
            })
            .collect();
        TimeSeries {
            dt,
            start_time: 0.0,
            samples,
        }
    }

    #[test]
    fn test_single_mode_recovered() {
        let series = ring_down(&[(1.0, 0.118, 0.0046)], 0.05, 4000);
        let band = ExcitationBand::new(0.15, 0.1).unwrap();
        let modes = MatrixPencil::default().extract_modes(&series, &band).unwrap();
        assert_eq!(modes.len(), 1);
        assert_relative_eq!(modes[0].frequency, 0.118, max_relative = 1e-8);
        assert_relative_eq!(modes[0].decay_rate, 0.0046, max_relative = 1e-6);
        assert_relative_eq!(modes[0].quality_factor, PI * 0.118 / 0.0046, max_relative = 1e-6);
        assert_relative_eq!(modes[0].amplitude, 1.0, max_relative = 1e-6);
        assert!(modes[0].error < 1e-6);
    }

    #[test]
    fn test_two_modes_sorted_and_band_filtered() {
        let series = ring_down(
            &[(0.5, 0.16, 0.03), (1.0, 0.12, 0.001), (0.8, 0.3, 0.002)],
            0.05,
            4000,
        );
        let band = ExcitationBand::new(0.15, 0.1).unwrap();
        let modes = MatrixPencil::default().extract_modes(&series, &band).unwrap();
        let freqs: Vec<f64> = modes.iter().map(|m| m.frequency).collect();
        assert_eq!(freqs.len(), 2, "found {freqs:?}");
        assert_relative_eq!(freqs[0], 0.12, max_relative = 1e-6);
        assert_relative_eq!(freqs[1], 0.16, max_relative = 1e-6);
        assert!(modes[0].quality_factor > modes[1].quality_factor);
    }

    #[test]
    fn test_silent_signal_has_no_modes() {
        let series = TimeSeries {
            dt: 0.05,
            start_time: 0.0,
            samples: vec![0.0; 2000],
        };
        let band = ExcitationBand::new(0.15, 0.1).unwrap();
        assert!(MatrixPencil::default()
            .extract_modes(&series, &band)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_out_of_band_signal_has_no_modes() {
        let series = ring_down(&[(1.0, 0.118, 0.0046)], 0.05, 4000);
        let band = ExcitationBand::new(0.5, 0.1).unwrap();
        assert!(MatrixPencil::default()
            .extract_modes(&series, &band)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_short_and_invalid_series() {
        let band = ExcitationBand::new(0.15, 0.1).unwrap();
        let short = ring_down(&[(1.0, 0.118, 0.0)], 0.05, 40);
        assert!(matches!(
            MatrixPencil::default().extract_modes(&short, &band),
            Err(HarmonicError::TooShort { .. })
        ));
        let bad = TimeSeries {
            dt: 0.0,
            start_time: 0.0,
            samples: vec![1.0; 100],
        };
        assert!(matches!(
            MatrixPencil::default().extract_modes(&bad, &band),
            Err(HarmonicError::InvalidSampling(_))
        ));
    }
}
