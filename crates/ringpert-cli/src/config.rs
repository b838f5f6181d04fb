//! TOML configuration deserialisation for perturbation studies.
//!
//! Every section and field is optional; an empty file runs the reference
//! study (a = 1, w = 1, n = 3.4, m = 4, FDTD at resolution 100).

use serde::{Deserialize, Serialize};

use ringpert_core::mode_finder::SelectionPolicy;
use ringpert_core::types::Polarization;

/// Top-level job configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct JobConfig {
    pub geometry: GeometryConfig,
    pub simulation: SimulationConfig,
    pub sweep: SweepConfig,
    pub output: OutputConfig,
}

/// Ring parameters.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Inner radius a.
    pub inner_radius: f64,
    /// Waveguide width w.
    pub width: f64,
    /// Refractive index of the ring.
    pub index: f64,
    /// Air gap between the ring and the absorber.
    pub padding: f64,
    /// Absorber thickness.
    pub absorber_thickness: f64,
    /// Cell reduction: "azimuthal", "mirror_y" or "none".
    pub symmetry: String,
    /// Azimuthal order (used with "azimuthal").
    pub m: i32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            inner_radius: 1.0,
            width: 1.0,
            index: 3.4,
            padding: 4.0,
            absorber_thickness: 2.0,
            symmetry: "azimuthal".into(),
            m: 4,
        }
    }
}

/// Solver and mode-search parameters.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Field solver: "fdtd" or "surrogate".
    pub solver: String,
    pub polarization: Polarization,
    pub baseline_resolution: f64,
    /// Centre and width of the broadband discovery pulse.
    pub band_center: f64,
    pub band_width: f64,
    /// Width of the search band each sweep point uses.
    pub sweep_band_width: f64,
    pub steady_width: f64,
    pub discovery_run_time: f64,
    pub steady_run_time: f64,
    pub selection: SelectionPolicy,
    /// Angles sampled on each ring wall.
    pub angle_count: usize,
    pub courant: f64,
    pub absorber_reflection: f64,
    pub absorber_order: f64,
    /// Compute backend: "cpu" or "serial". Default: "cpu".
    pub backend: String,
    /// Worker threads for the "cpu" backend (default: all cores).
    pub threads: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            solver: "fdtd".into(),
            polarization: Polarization::Ez,
            baseline_resolution: 100.0,
            band_center: 0.15,
            band_width: 0.1,
            sweep_band_width: 0.01,
            steady_width: 0.01,
            discovery_run_time: 200.0,
            steady_run_time: 200.0,
            selection: SelectionPolicy::MaxQuality,
            angle_count: 10,
            courant: 0.5,
            absorber_reflection: 1e-6,
            absorber_order: 2.0,
            backend: "cpu".into(),
            threads: None,
        }
    }
}

/// Perturbation amounts: either log-spaced or an explicit list.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PerturbationSpec {
    LogRange { exponents: [f64; 2], points: usize },
    List { values: Vec<f64> },
}

impl PerturbationSpec {
    pub fn values(&self) -> Vec<f64> {
        match self {
            PerturbationSpec::LogRange { exponents, points } => {
                ringpert_core::sweep::log_space(exponents[0], exponents[1], *points)
            }
            PerturbationSpec::List { values } => values.clone(),
        }
    }
}

/// Sweep values.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepConfig {
    pub resolutions: Vec<f64>,
    pub perturbations: PerturbationSpec,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            resolutions: vec![10.0, 20.0, 40.0, 80.0, 100.0, 160.0, 320.0],
            perturbations: PerturbationSpec::LogRange {
                exponents: [-7.0, -1.5],
                points: 10,
            },
        }
    }
}

/// Output configuration.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    pub directory: String,
    /// Whether to save each error curve as CSV (default: true).
    pub save_csv: bool,
    /// Whether to save the full report as JSON (default: true).
    pub save_json: bool,
    /// Whether to draw log-log SVG plots of the error curves (default: true).
    pub save_plots: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./output".into(),
            save_csv: true,
            save_json: true,
            save_plots: true,
        }
    }
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: JobConfig = toml::from_str(&content)?;
    Ok(config)
}
