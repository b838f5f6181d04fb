//! Study report and curve emission.
//!
//! [`StudyReport`] collects everything a study produced in one serialisable
//! value. Curves are handed to [`CurveRenderer`]s (files, plots) through a
//! [`ReportWriter`]; a renderer that fails is reported and skipped, the
//! report itself is never lost.

use log::{info, warn};
use ringpert_geometry::RingGeometry;
use serde::Serialize;
use thiserror::Error;

use crate::analysis::{successive_differences, ErrorCurve};
use crate::perturbation::PerturbationEstimate;
use crate::types::{Polarization, ResonanceMode, SweepResult};

/// Errors raised while writing or rendering results.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rendering failed: {0}")]
    Render(String),
}

/// Something that can draw or store one error curve.
pub trait CurveRenderer {
    fn render(&self, curve: &ErrorCurve) -> Result<(), ReportError>;

    /// Human-readable name of the output format.
    fn format_name(&self) -> &str;
}

/// The unperturbed measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineSummary {
    pub resolution: f64,
    pub mode: ResonanceMode,
    /// Every mode the discovery run reported, sorted by frequency.
    pub candidates: Vec<ResonanceMode>,
    pub estimate: PerturbationEstimate,
}

/// Convergence order estimated from one curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveFit {
    pub name: String,
    pub points: usize,
    pub loglog_slope: Option<f64>,
}

/// Everything a study produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyReport {
    pub geometry: RingGeometry,
    pub polarization: Polarization,
    pub solver: String,
    pub harmonic_inversion: String,
    pub baseline: BaselineSummary,
    pub perturbation_sweep: SweepResult,
    pub resolution_sweep: SweepResult,
    pub curves: Vec<ErrorCurve>,
    pub fits: Vec<CurveFit>,
}

impl StudyReport {
    /// Assemble the report and derive its error curves.
    pub fn new(
        geometry: RingGeometry,
        polarization: Polarization,
        solver: &str,
        harmonic_inversion: &str,
        baseline: BaselineSummary,
        perturbation_sweep: SweepResult,
        resolution_sweep: SweepResult,
    ) -> Self {
        let curves = vec![
            ErrorCurve::frequency_error(&perturbation_sweep),
            ErrorCurve::derivative_error(&perturbation_sweep),
            ErrorCurve::frequency_error(&resolution_sweep),
        ];
        let fits = curves
            .iter()
            .map(|c| CurveFit {
                name: c.name.clone(),
                points: c.points.len(),
                loglog_slope: c.loglog_slope(),
            })
            .collect();
        Self {
            geometry,
            polarization,
            solver: solver.to_string(),
            harmonic_inversion: harmonic_inversion.to_string(),
            baseline,
            perturbation_sweep,
            resolution_sweep,
            curves,
            fits,
        }
    }

    pub fn curve(&self, name: &str) -> Option<&ErrorCurve> {
        self.curves.iter().find(|c| c.name == name)
    }

    /// Human-readable summary, one line per entry.
    pub fn summary_lines(&self) -> Vec<String> {
        let b = &self.baseline;
        let mut lines = vec![format!(
            "{} ({} polarization, {} at resolution {})",
            self.geometry, self.polarization, self.solver, b.resolution
        )];
        lines.push(format!(
            "{} found {} resonant mode(s)",
            self.harmonic_inversion,
            b.candidates.len()
        ));
        for mode in &b.candidates {
            lines.push(format!(
                "  f={:.9}, Q={:.2}, error={:.2e}",
                mode.frequency, mode.quality_factor, mode.error
            ));
        }
        lines.push(format!(
            "Selected f={:.9} (Q={:.2})",
            b.mode.frequency, b.mode.quality_factor
        ));
        lines.push(format!(
            "Surface integral {:.6e}, stored energy {:.6e}, dw/dR = {:.6e}",
            b.estimate.numerator, b.estimate.denominator, b.estimate.dw_dr
        ));
        for sweep in [&self.perturbation_sweep, &self.resolution_sweep] {
            lines.push(format!(
                "{} sweep: {} point(s), {} failure(s)",
                sweep.axis,
                sweep.points.len(),
                sweep.failures.len()
            ));
            for p in &sweep.points {
                lines.push(format!(
                    "  {}={:.4e}: measured {:.9}, predicted {:.9}, rel. error {:.3e}",
                    sweep.axis,
                    p.independent_variable,
                    p.measured_frequency,
                    p.predicted_frequency,
                    p.relative_error
                ));
            }
        }
        let diffs = successive_differences(&self.resolution_sweep);
        if let Some(last) = diffs.last() {
            lines.push(format!("Last resolution step changed f by {last:.3e}"));
        }
        for fit in &self.fits {
            match fit.loglog_slope {
                Some(slope) => lines.push(format!("{}: log-log slope {:.2}", fit.name, slope)),
                None => lines.push(format!("{}: too few points for a slope", fit.name)),
            }
        }
        lines
    }
}

/// Hands every curve of a report to a set of renderers.
#[derive(Default)]
pub struct ReportWriter<'a> {
    renderers: Vec<&'a dyn CurveRenderer>,
}

impl<'a> ReportWriter<'a> {
    pub fn new() -> Self {
        Self {
            renderers: Vec::new(),
        }
    }

    pub fn with_renderer(mut self, renderer: &'a dyn CurveRenderer) -> Self {
        self.renderers.push(renderer);
        self
    }

    /// Render every curve with every renderer; returns the number of
    /// successful renders. Failures are logged and skipped.
    pub fn emit(&self, report: &StudyReport) -> usize {
        let mut rendered = 0;
        for curve in &report.curves {
            if curve.loglog_points().next().is_none() {
                warn!("{}: no drawable points, skipped", curve.name);
                continue;
            }
            for renderer in &self.renderers {
                match renderer.render(curve) {
                    Ok(()) => {
                        info!("{}: wrote {}", renderer.format_name(), curve.name);
                        rendered += 1;
                    }
                    Err(e) => warn!("{}: could not write {}: {}", renderer.format_name(), curve.name, e),
                }
            }
        }
        rendered
    }
}
