//! Error analysis of sweep results.
//!
//! Turns sweep points into error curves ready for log-log rendering and
//! estimates convergence orders from them.

use serde::Serialize;

use crate::error::StudyError;
use crate::types::{SweepAxis, SweepResult};

/// $|(\text{predicted} - \text{measured}) / \text{measured}|$.
///
/// A zero or non-finite `measured` value has no relative error; it is
/// reported as [`StudyError::DegenerateComparison`] rather than a NaN.
pub fn relative_error(predicted: f64, measured: f64) -> Result<f64, StudyError> {
    if measured == 0.0 || !measured.is_finite() || !predicted.is_finite() {
        return Err(StudyError::DegenerateComparison(format!(
            "cannot compare predicted {predicted} against measured {measured}"
        )));
    }
    Ok(((predicted - measured) / measured).abs())
}

/// One curve of a convergence plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorCurve {
    /// Short identifier, also used as the artifact name.
    pub name: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// `(x, y)` pairs in sweep order.
    pub points: Vec<(f64, f64)>,
}

impl ErrorCurve {
    /// Relative error of the predicted frequency against the sweep variable.
    pub fn frequency_error(result: &SweepResult) -> Self {
        let (name, title, x_label) = match result.axis {
            SweepAxis::Resolution => (
                "frequency_error_vs_resolution",
                "Relative error vs. resolution",
                "resolution",
            ),
            SweepAxis::Perturbation => (
                "frequency_error_vs_dr",
                "Relative error vs. perturbation amount",
                "perturbation amount dr",
            ),
        };
        Self {
            name: name.into(),
            title: title.into(),
            x_label: x_label.into(),
            y_label: "relative error".into(),
            points: result
                .points
                .iter()
                .map(|p| (p.independent_variable, p.relative_error))
                .collect(),
        }
    }

    /// Relative error of the finite-difference slope against the predicted
    /// slope. Points without a derivative check are skipped.
    pub fn derivative_error(result: &SweepResult) -> Self {
        Self {
            name: "dw_dr_error_vs_dr".into(),
            title: "Relative error of dw/dR vs. perturbation amount".into(),
            x_label: "perturbation amount dr".into(),
            y_label: "relative error".into(),
            points: result
                .points
                .iter()
                .filter_map(|p| {
                    p.derivative
                        .and_then(|d| d.relative_error)
                        .map(|err| (p.independent_variable, err))
                })
                .collect(),
        }
    }

    /// Points that can be drawn on log-log axes.
    pub fn loglog_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points
            .iter()
            .copied()
            .filter(|&(x, y)| x > 0.0 && y > 0.0 && x.is_finite() && y.is_finite())
    }

    /// Least-squares slope of $\log y$ against $\log x$, if at least two
    /// distinct points can be drawn.
    pub fn loglog_slope(&self) -> Option<f64> {
        let logs: Vec<(f64, f64)> = self
            .loglog_points()
            .map(|(x, y)| (x.ln(), y.ln()))
            .collect();
        if logs.len() < 2 {
            return None;
        }
        let n = logs.len() as f64;
        let mx = logs.iter().map(|p| p.0).sum::<f64>() / n;
        let my = logs.iter().map(|p| p.1).sum::<f64>() / n;
        let sxx: f64 = logs.iter().map(|p| (p.0 - mx).powi(2)).sum();
        let sxy: f64 = logs.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
        if sxx == 0.0 {
            return None;
        }
        Some(sxy / sxx)
    }
}

/// Differences $|f_{k+1} - f_k|$ between successive measured frequencies.
///
/// For a converging resolution sweep these shrink as the grid is refined.
pub fn successive_differences(result: &SweepResult) -> Vec<f64> {
    result
        .points
        .windows(2)
        .map(|w| (w[1].measured_frequency - w[0].measured_frequency).abs())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DerivativeCheck, SweepPoint};
    use approx::assert_relative_eq;

    fn point(index: usize, x: f64, measured: f64, err: f64) -> SweepPoint {
        SweepPoint {
            index,
            independent_variable: x,
            dr: x,
            resolution: 100.0,
            predicted_frequency: measured * (1.0 + err),
            measured_frequency: measured,
            measured_quality_factor: 100.0,
            relative_error: err,
            derivative: Some(DerivativeCheck {
                analytic: -0.01,
                empirical: -0.011,
                relative_error: if index == 0 { None } else { Some(0.1) },
            }),
        }
    }

    #[test]
    fn test_relative_error() {
        assert_relative_eq!(relative_error(1.1, 1.0).unwrap(), 0.1, max_relative = 1e-12);
        assert_relative_eq!(relative_error(0.9, 1.0).unwrap(), 0.1, max_relative = 1e-12);
        assert_eq!(relative_error(0.5, 0.5).unwrap(), 0.0);
        assert!(matches!(
            relative_error(1.0, 0.0),
            Err(StudyError::DegenerateComparison(_))
        ));
        assert!(relative_error(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_quadratic_curve_has_slope_two() {
        let result = SweepResult {
            axis: SweepAxis::Perturbation,
            points: (0..5)
                .map(|k| {
                    let dr = 10f64.powi(-(k as i32) - 1);
                    point(k, dr, 0.12, 3.0 * dr * dr)
                })
                .collect(),
            failures: Vec::new(),
        };
        let curve = ErrorCurve::frequency_error(&result);
        assert_eq!(curve.name, "frequency_error_vs_dr");
        assert_relative_eq!(curve.loglog_slope().unwrap(), 2.0, max_relative = 1e-9);
    }

    #[test]
    fn test_derivative_curve_skips_missing_checks() {
        let result = SweepResult {
            axis: SweepAxis::Perturbation,
            points: vec![point(0, 0.1, 0.12, 0.01), point(1, 0.01, 0.12, 0.001)],
            failures: Vec::new(),
        };
        let curve = ErrorCurve::derivative_error(&result);
        assert_eq!(curve.points, vec![(0.01, 0.1)]);
        assert!(curve.loglog_slope().is_none());
    }

    #[test]
    fn test_zero_errors_are_not_drawn() {
        let curve = ErrorCurve {
            name: "c".into(),
            title: "c".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            points: vec![(1.0, 0.0), (2.0, 1.0), (-1.0, 1.0)],
        };
        assert_eq!(curve.loglog_points().count(), 1);
    }

    #[test]
    fn test_successive_differences() {
        let result = SweepResult {
            axis: SweepAxis::Resolution,
            points: vec![point(0, 10.0, 0.13, 0.1), point(1, 20.0, 0.125, 0.05), point(2, 40.0, 0.124, 0.01)],
            failures: Vec::new(),
        };
        let diffs = successive_differences(&result);
        assert_eq!(diffs.len(), 2);
        assert!(diffs[1] < diffs[0]);
    }
}
