//! Study runner: ties together geometry, solver, harmonic inversion and
//! output.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use plotters::prelude::*;

use ringpert_compute::{ComputeBackend, CpuBackend, SerialBackend};
use ringpert_core::analysis::ErrorCurve;
use ringpert_core::harminv::MatrixPencil;
use ringpert_core::mode_finder::ModeFinderSettings;
use ringpert_core::report::{CurveRenderer, ReportError, ReportWriter, StudyReport};
use ringpert_core::solver::fdtd::CylindricalFdtd;
use ringpert_core::solver::surrogate::SurrogateSolver;
use ringpert_core::solver::FieldSolver;
use ringpert_core::study::{PerturbationStudy, StudySettings};
use ringpert_core::types::{AbsorberSpec, ExcitationBand, SimulationSettings};
use ringpert_geometry::{RingGeometry, Symmetry};

use crate::config::JobConfig;

/// Build the ring described by the `[geometry]` section.
pub fn build_geometry(job: &JobConfig) -> Result<RingGeometry> {
    let g = &job.geometry;
    let symmetry = match g.symmetry.as_str() {
        "azimuthal" => Symmetry::Azimuthal { m: g.m },
        "mirror_y" => Symmetry::MirrorY,
        "none" => Symmetry::None,
        other => anyhow::bail!(
            "Unsupported symmetry '{}'. Valid values: azimuthal, mirror_y, none",
            other
        ),
    };
    RingGeometry::new(
        g.inner_radius,
        g.width,
        g.index,
        g.padding,
        g.absorber_thickness,
        symmetry,
    )
    .context("Invalid [geometry] section")
}

/// Translate the `[simulation]` and `[sweep]` sections into study settings.
pub fn build_settings(job: &JobConfig) -> Result<StudySettings> {
    let sim = &job.simulation;
    let discovery_band = ExcitationBand::new(sim.band_center, sim.band_width)
        .map_err(|e| anyhow::anyhow!("Invalid discovery band: {}", e))?;
    let settings = StudySettings {
        simulation: SimulationSettings {
            polarization: sim.polarization,
            absorber: AbsorberSpec {
                profile_order: sim.absorber_order,
                reflection: sim.absorber_reflection,
            },
            courant: sim.courant,
        },
        mode_finder: ModeFinderSettings {
            discovery_run_time: sim.discovery_run_time,
            steady_width: sim.steady_width,
            steady_run_time: sim.steady_run_time,
            policy: sim.selection,
        },
        baseline_resolution: sim.baseline_resolution,
        discovery_band,
        sweep_band_width: sim.sweep_band_width,
        angle_count: sim.angle_count,
        resolutions: job.sweep.resolutions.clone(),
        perturbations: job.sweep.perturbations.values(),
    };
    settings.validate().context("Invalid study settings")?;
    Ok(settings)
}

/// Solver factory for the configured method name.
pub fn solver_factory(name: &str) -> Result<fn() -> Box<dyn FieldSolver>> {
    fn fdtd() -> Box<dyn FieldSolver> {
        Box::new(CylindricalFdtd::default())
    }
    fn surrogate() -> Box<dyn FieldSolver> {
        Box::new(SurrogateSolver::default())
    }
    match name {
        "fdtd" => Ok(fdtd),
        "surrogate" => Ok(surrogate),
        other => anyhow::bail!(
            "Unknown solver '{}'. Valid solvers: fdtd, surrogate",
            other
        ),
    }
}

/// Run the full study described by a parsed job configuration.
pub fn run_study(job: &JobConfig) -> Result<StudyReport> {
    let geometry = build_geometry(job)?;
    let settings = build_settings(job)?;
    let factory = solver_factory(&job.simulation.solver)?;
    let backend = create_backend(&job.simulation.backend, job.simulation.threads);
    let pencil = MatrixPencil::default();

    println!("Geometry: {}", geometry);
    println!(
        "Sweeps: {} perturbation(s), {} resolution(s)",
        settings.perturbations.len(),
        settings.resolutions.len()
    );

    let study = PerturbationStudy {
        geometry,
        settings,
        factory: &factory,
        harminv: &pencil,
        backend: backend.as_ref(),
    };
    let report = study.run().context("Perturbation study failed")?;

    for failure in report
        .perturbation_sweep
        .failures
        .iter()
        .chain(&report.resolution_sweep.failures)
    {
        eprintln!(
            "Warning: sweep point {} ({:.4e}) skipped: {}",
            failure.index, failure.independent_variable, failure.reason
        );
    }
    Ok(report)
}

/// Write the configured artifacts for a finished study.
pub fn write_outputs(report: &StudyReport, job: &JobConfig, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Cannot create output directory {}", out_dir.display()))?;

    if job.output.save_json {
        write_report_json(report, &out_dir.join("report.json"))?;
    }

    let csv = CsvCurveWriter {
        directory: out_dir.to_path_buf(),
        header: csv_header(report),
    };
    let svg = SvgCurvePlotter::new(out_dir);
    let mut writer = ReportWriter::new();
    if job.output.save_csv {
        writer = writer.with_renderer(&csv);
    }
    if job.output.save_plots {
        writer = writer.with_renderer(&svg);
    }
    let rendered = writer.emit(report);
    println!("{} curve file(s) written to: {}", rendered, out_dir.display());
    Ok(())
}

/// Write the full report as pretty-printed JSON.
pub fn write_report_json(report: &StudyReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;
    println!("Report (JSON) written to: {}", path.display());
    Ok(())
}

fn csv_header(report: &StudyReport) -> Vec<String> {
    let b = &report.baseline;
    vec![
        "ringpert perturbation study".to_string(),
        format!("Version: {}", env!("CARGO_PKG_VERSION")),
        format!("{}", report.geometry),
        format!(
            "solver: {}, polarization: {}, baseline resolution: {}",
            report.solver, report.polarization, b.resolution
        ),
        format!(
            "baseline f: {:.9}, Q: {:.2}, dw/dR: {:.6e}",
            b.mode.frequency, b.mode.quality_factor, b.estimate.dw_dr
        ),
    ]
}

/// Stores each curve as `<name>.csv` with a `#` metadata header.
pub struct CsvCurveWriter {
    pub directory: PathBuf,
    pub header: Vec<String>,
}

impl CurveRenderer for CsvCurveWriter {
    fn render(&self, curve: &ErrorCurve) -> Result<(), ReportError> {
        let path = self.directory.join(format!("{}.csv", curve.name));
        let mut file = std::fs::File::create(&path)?;
        for line in &self.header {
            writeln!(file, "# {}", line)?;
        }
        writeln!(file, "# {}", curve.title)?;
        writeln!(file, "#")?;
        writeln!(file, "{},{}", csv_column(&curve.x_label), csv_column(&curve.y_label))?;
        for (x, y) in &curve.points {
            writeln!(file, "{:.9e},{:.9e}", x, y)?;
        }
        Ok(())
    }

    fn format_name(&self) -> &str {
        "CSV"
    }
}

fn csv_column(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Draws each curve on log-log axes as `<name>.svg`.
pub struct SvgCurvePlotter {
    pub directory: PathBuf,
    pub size: (u32, u32),
}

impl SvgCurvePlotter {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            size: (1024, 768),
        }
    }
}

impl CurveRenderer for SvgCurvePlotter {
    fn render(&self, curve: &ErrorCurve) -> Result<(), ReportError> {
        let points: Vec<(f64, f64)> = curve.loglog_points().collect();
        let (x_lo, x_hi) = padded_range(points.iter().map(|p| p.0))?;
        let (y_lo, y_hi) = padded_range(points.iter().map(|p| p.1))?;

        let path = self.directory.join(format!("{}.svg", curve.name));
        let root = SVGBackend::new(&path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&curve.title, ("sans-serif", 32.0).into_font())
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d((x_lo..x_hi).log_scale(), (y_lo..y_hi).log_scale())
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .x_desc(curve.x_label.as_str())
            .y_desc(curve.y_label.as_str())
            .x_label_formatter(&|x| format!("{:.0e}", x))
            .y_label_formatter(&|y| format!("{:.0e}", y))
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))
            .map_err(render_error)?;
        chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 4, BLUE.filled())))
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
        Ok(())
    }

    fn format_name(&self) -> &str {
        "SVG"
    }
}

fn render_error<E: std::fmt::Display>(e: E) -> ReportError {
    ReportError::Render(e.to_string())
}

/// Bounds of positive values widened by half a decade on each side.
fn padded_range(values: impl Iterator<Item = f64>) -> Result<(f64, f64), ReportError> {
    let (lo, hi) = values.fold((f64::INFINITY, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && lo > 0.0) {
        return Err(ReportError::Render("no positive values to plot".into()));
    }
    let pad = 10f64.powf(0.5);
    Ok((lo / pad, hi * pad))
}

/// Create a compute backend based on the user's preference string.
///
/// - `"serial"`: run sweep points one after another.
/// - `"cpu"` (default): run sweep points on a Rayon pool.
fn create_backend(preference: &str, threads: Option<usize>) -> Box<dyn ComputeBackend> {
    match preference {
        "serial" => {
            println!("Backend: serial");
            Box::new(SerialBackend)
        }
        other => {
            if other != "cpu" {
                eprintln!("Warning: unknown backend '{}', using CPU", other);
            }
            let backend = match threads {
                Some(n) => CpuBackend::with_threads(n),
                None => CpuBackend::new(),
            };
            println!("Backend: {}", backend.device_info().name);
            Box::new(backend)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PerturbationSpec;

    fn surrogate_job(dir: &Path) -> JobConfig {
        let mut job = JobConfig::default();
        job.geometry.m = 3;
        job.simulation.solver = "surrogate".into();
        job.simulation.backend = "serial".into();
        job.sweep.resolutions = vec![20.0, 40.0, 80.0];
        job.sweep.perturbations = PerturbationSpec::List {
            values: vec![1e-3, 1e-2],
        };
        job.output.directory = dir.display().to_string();
        job
    }

    #[test]
    fn test_unknown_names_rejected() {
        let mut job = JobConfig::default();
        job.geometry.symmetry = "spherical".into();
        assert!(build_geometry(&job).is_err());
        assert!(solver_factory("bem").is_err());
    }

    #[test]
    fn test_invalid_band_rejected() {
        let mut job = JobConfig::default();
        job.simulation.band_width = 0.0;
        assert!(build_settings(&job).is_err());
    }

    #[test]
    fn test_csv_column_names() {
        assert_eq!(csv_column("Perturbation dr"), "perturbation_dr");
        assert_eq!(csv_column("Resolution (pixels/unit)"), "resolution__pixels_unit");
    }

    #[test]
    fn test_surrogate_study_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let job = surrogate_job(dir.path());
        let report = run_study(&job).unwrap();
        assert_eq!(report.perturbation_sweep.points.len(), 2);
        assert_eq!(report.resolution_sweep.points.len(), 3);

        write_outputs(&report, &job, dir.path()).unwrap();
        let json = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
        assert!(json.contains("\"resolution_sweep\""));

        let csv = std::fs::read_to_string(dir.path().join("frequency_error_vs_dr.csv")).unwrap();
        let data: Vec<&str> = csv.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(data.len(), 3);
        assert!(csv.lines().next().unwrap().starts_with("# ringpert"));
        assert!(dir.path().join("frequency_error_vs_resolution.csv").exists());
    }
}
