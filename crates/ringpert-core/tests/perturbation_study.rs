//! End-to-end study behaviour against the analytic surrogate solver.
//!
//! The surrogate's frequencies, decay rates and fields are closed-form, so
//! these tests can assert exact trends (sign of the shift, convergence order,
//! determinism across backends) without the cost of a grid solver.

use num_complex::Complex64;
use ringpert_compute::{CpuBackend, SerialBackend};
use ringpert_core::analysis::{successive_differences, ErrorCurve};
use ringpert_core::harminv::MatrixPencil;
use ringpert_core::mode_finder::{ModeFinder, ModeFinderSettings};
use ringpert_core::solver::surrogate::SurrogateSolver;
use ringpert_core::solver::{FieldSolver, RunRequest, SimulationHandle, SolverError};
use ringpert_core::study::{PerturbationStudy, StudySettings};
use ringpert_core::types::{ExcitationBand, SimulationSettings, TimeSeries};
use ringpert_core::StudyError;
use ringpert_geometry::{PolarPoint, Region, RingGeometry, Symmetry};

fn ring(m: i32) -> RingGeometry {
    RingGeometry::new(1.0, 1.0, 3.4, 4.0, 2.0, Symmetry::Azimuthal { m }).unwrap()
}

fn surrogate() -> Box<dyn FieldSolver> {
    Box::new(SurrogateSolver::default())
}

fn quick_settings() -> StudySettings {
    StudySettings {
        resolutions: vec![10.0, 20.0, 40.0, 80.0, 160.0],
        perturbations: vec![
            10f64.powf(-2.5),
            10f64.powf(-2.0),
            10f64.powf(-1.5),
        ],
        ..StudySettings::default()
    }
}

#[test]
fn test_baseline_recovers_surrogate_mode_and_slope() {
    let geometry = ring(3);
    let pencil = MatrixPencil::default();
    let study = PerturbationStudy {
        geometry: geometry.clone(),
        settings: quick_settings(),
        factory: &surrogate,
        harminv: &pencil,
        backend: &SerialBackend,
    };
    let baseline = study.run_baseline().unwrap();

    let model = SurrogateSolver::default();
    let expected = model.fundamental_frequency(&geometry, 100.0);
    assert!(
        ((baseline.mode.frequency - expected) / expected).abs() < 1e-8,
        "baseline {} vs model {}",
        baseline.mode.frequency,
        expected
    );
    // the broadband run also sees the lossy second radial order
    assert_eq!(baseline.candidates.len(), 2);
    assert!(baseline.candidates[0].frequency < baseline.candidates[1].frequency);
    assert!(baseline.mode.quality_factor > baseline.candidates[1].quality_factor);

    let slope = model.frequency_slope(&geometry, 100.0);
    assert!(baseline.estimate.dw_dr < 0.0);
    assert!(
        ((baseline.estimate.dw_dr - slope) / slope).abs() < 1e-6,
        "predicted dw/dR {} vs model {}",
        baseline.estimate.dw_dr,
        slope
    );
}

#[test]
fn test_concrete_ring_resonance_near_0_118() {
    let geometry = ring(3);
    let pencil = MatrixPencil::default();
    let finder = ModeFinder::new(&pencil, ModeFinderSettings::default());
    let config = SimulationSettings::default().config_for(&geometry, 100.0);
    let band = ExcitationBand::new(0.15, 0.1).unwrap();
    let discovery = finder
        .discover(&SurrogateSolver::default(), &geometry, &config, &band)
        .unwrap();
    eprintln!("selected f={:.6}, Q={:.1}", discovery.mode.frequency, discovery.mode.quality_factor);
    assert!((discovery.mode.frequency - 0.118).abs() < 0.005);
}

#[test]
fn test_steady_state_is_rotationally_symmetric() {
    let geometry = ring(4);
    let pencil = MatrixPencil::default();
    let finder = ModeFinder::new(&pencil, ModeFinderSettings::default());
    let config = SimulationSettings::default().config_for(&geometry, 100.0);
    let band = ExcitationBand::new(0.15, 0.1).unwrap();
    let steady = finder
        .find_resonance(&SurrogateSolver::default(), &geometry, &config, &band)
        .unwrap();

    let sampler = ringpert_core::sampler::FieldSampler::new(config.polarization);
    for radius in [geometry.inner_radius(), geometry.outer_radius()] {
        let circle = sampler
            .sample_boundary(steady.simulation.as_ref(), radius, 10)
            .unwrap();
        assert!(circle.mean_magnitude() > 0.0);
        assert!(
            circle.relative_spread() < 1e-12,
            "spread {} on r={}",
            circle.relative_spread(),
            radius
        );
    }
}

#[test]
fn test_perturbation_sweep_is_first_order_consistent() {
    let geometry = ring(3);
    let pencil = MatrixPencil::default();
    let settings = StudySettings {
        resolutions: Vec::new(),
        ..quick_settings()
    };
    let study = PerturbationStudy {
        geometry,
        settings,
        factory: &surrogate,
        harminv: &pencil,
        backend: &SerialBackend,
    };
    let report = study.run().unwrap();
    let sweep = &report.perturbation_sweep;
    assert!(sweep.failures.is_empty(), "failures: {:?}", sweep.failures);
    assert_eq!(sweep.points.len(), 3);

    eprintln!("{:>12} {:>14} {:>14} {:>12}", "dr", "measured", "predicted", "rel. error");
    for p in &sweep.points {
        eprintln!(
            "{:12.3e} {:14.9} {:14.9} {:12.3e}",
            p.independent_variable, p.measured_frequency, p.predicted_frequency, p.relative_error
        );
        // growing the ring lowers the frequency
        assert!(p.measured_frequency < report.baseline.mode.frequency);
        assert!(p.predicted_frequency < report.baseline.mode.frequency);
    }

    // smaller perturbations are predicted better
    assert!(sweep.points[0].relative_error < sweep.points[1].relative_error);
    assert!(sweep.points[1].relative_error < sweep.points[2].relative_error);
    let slope = ErrorCurve::frequency_error(sweep).loglog_slope().unwrap();
    assert!((1.5..2.5).contains(&slope), "error order {slope}");

    // the finite-difference slope approaches the predicted one
    let deriv: Vec<f64> = sweep
        .points
        .iter()
        .map(|p| p.derivative.and_then(|d| d.relative_error).unwrap())
        .collect();
    assert!(deriv[0] < deriv[2]);
    assert!(report.resolution_sweep.points.is_empty());
}

#[test]
fn test_resolution_sweep_converges() {
    let geometry = ring(3);
    let pencil = MatrixPencil::default();
    let settings = quick_settings();
    let resolutions = settings.resolutions.clone();
    let study = PerturbationStudy {
        geometry,
        settings,
        factory: &surrogate,
        harminv: &pencil,
        backend: &SerialBackend,
    };
    let report = study.run().unwrap();
    let sweep = &report.resolution_sweep;
    assert_eq!(sweep.points.len(), resolutions.len());
    for (p, r) in sweep.points.iter().zip(&resolutions) {
        assert_eq!(p.independent_variable, *r);
        assert_eq!(p.dr, 10f64.powf(-1.5));
    }

    let diffs = successive_differences(sweep);
    assert!(diffs.windows(2).all(|w| w[1] < w[0]), "differences {diffs:?}");
    let first = sweep.points.first().unwrap().relative_error;
    let last = sweep.points.last().unwrap().relative_error;
    assert!(last < first);
}

#[test]
fn test_study_is_deterministic_across_backends() {
    let pencil = MatrixPencil::default();
    let serial = PerturbationStudy {
        geometry: ring(3),
        settings: quick_settings(),
        factory: &surrogate,
        harminv: &pencil,
        backend: &SerialBackend,
    }
    .run()
    .unwrap();
    let parallel_backend = CpuBackend::with_threads(4);
    let parallel = PerturbationStudy {
        geometry: ring(3),
        settings: quick_settings(),
        factory: &surrogate,
        harminv: &pencil,
        backend: &parallel_backend,
    }
    .run()
    .unwrap();
    assert_eq!(serial, parallel);

    let again = PerturbationStudy {
        geometry: ring(3),
        settings: quick_settings(),
        factory: &surrogate,
        harminv: &pencil,
        backend: &SerialBackend,
    }
    .run()
    .unwrap();
    assert_eq!(serial, again);
}

#[test]
fn test_no_resonance_in_far_band_is_fatal() {
    let pencil = MatrixPencil::default();
    let settings = StudySettings {
        discovery_band: ExcitationBand::new(0.5, 0.05).unwrap(),
        ..quick_settings()
    };
    let study = PerturbationStudy {
        geometry: ring(3),
        settings,
        factory: &surrogate,
        harminv: &pencil,
        backend: &SerialBackend,
    };
    let err = study.run().unwrap_err();
    match err {
        StudyError::NoResonanceFound { band, geometry } => {
            assert_eq!(band.center, 0.5);
            assert_eq!(geometry.outer_radius(), 2.0);
        }
        other => panic!("expected NoResonanceFound, got {other}"),
    }
}

/// Surrogate whose steady state stores no energy.
struct EmptyCavity;

struct EmptyHandle(Box<dyn SimulationHandle>);

impl SimulationHandle for EmptyHandle {
    fn sample_field(
        &self,
        component: ringpert_core::types::FieldComponent,
        point: &PolarPoint,
    ) -> Result<Complex64, SolverError> {
        self.0.sample_field(component, point)
    }

    fn field_energy(&self, _region: &Region) -> Result<f64, SolverError> {
        Ok(0.0)
    }

    fn time_series(&self) -> Option<&TimeSeries> {
        self.0.time_series()
    }

    fn elapsed_time(&self) -> f64 {
        self.0.elapsed_time()
    }
}

impl FieldSolver for EmptyCavity {
    fn run(&self, request: &RunRequest<'_>) -> Result<Box<dyn SimulationHandle>, SolverError> {
        let inner = SurrogateSolver::default().run(request)?;
        Ok(Box::new(EmptyHandle(inner)))
    }

    fn method_name(&self) -> &str {
        "empty cavity"
    }
}

#[test]
fn test_zero_stored_energy_is_degenerate() {
    let pencil = MatrixPencil::default();
    let factory = || -> Box<dyn FieldSolver> { Box::new(EmptyCavity) };
    let study = PerturbationStudy {
        geometry: ring(3),
        settings: quick_settings(),
        factory: &factory,
        harminv: &pencil,
        backend: &SerialBackend,
    };
    assert!(matches!(
        study.run_baseline(),
        Err(StudyError::DegenerateComparison(_))
    ));
}

/// Surrogate that refuses rings wider than `max_width`.
struct Picky {
    max_width: f64,
}

impl FieldSolver for Picky {
    fn run(&self, request: &RunRequest<'_>) -> Result<Box<dyn SimulationHandle>, SolverError> {
        if request.geometry.width() > self.max_width {
            return Err(SolverError::Unsupported(format!(
                "width {} exceeds {}",
                request.geometry.width(),
                self.max_width
            )));
        }
        SurrogateSolver::default().run(request)
    }

    fn method_name(&self) -> &str {
        "picky"
    }
}

#[test]
fn test_failed_points_are_recorded_and_skipped() {
    let pencil = MatrixPencil::default();
    let factory = || -> Box<dyn FieldSolver> { Box::new(Picky { max_width: 1.005 }) };
    let settings = StudySettings {
        perturbations: vec![1e-3, 1e-2, 3e-2],
        resolutions: Vec::new(),
        ..quick_settings()
    };
    let backend = CpuBackend::with_threads(3);
    let study = PerturbationStudy {
        geometry: ring(3),
        settings,
        factory: &factory,
        harminv: &pencil,
        backend: &backend,
    };
    let report = study.run().unwrap();
    let sweep = &report.perturbation_sweep;
    assert_eq!(sweep.points.len(), 1);
    assert_eq!(sweep.points[0].index, 0);
    assert_eq!(sweep.points[0].independent_variable, 1e-3);
    let failed: Vec<usize> = sweep.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 2]);
    assert!(sweep.failures[0].reason.contains("exceeds"));
}

/// Surrogate that panics on rings wider than `max_width`.
struct Fragile {
    max_width: f64,
}

impl FieldSolver for Fragile {
    fn run(&self, request: &RunRequest<'_>) -> Result<Box<dyn SimulationHandle>, SolverError> {
        if request.geometry.width() > self.max_width {
            panic!("grid blew up at width {}", request.geometry.width());
        }
        SurrogateSolver::default().run(request)
    }

    fn method_name(&self) -> &str {
        "fragile"
    }
}

#[test]
fn test_panicking_points_are_recorded_on_every_backend() {
    let pencil = MatrixPencil::default();
    let factory = || -> Box<dyn FieldSolver> { Box::new(Fragile { max_width: 1.005 }) };
    let parallel = CpuBackend::with_threads(3);
    let backends: [&dyn ringpert_compute::ComputeBackend; 2] = [&SerialBackend, &parallel];

    for backend in backends {
        let settings = StudySettings {
            perturbations: vec![1e-3, 1e-2, 3e-2],
            resolutions: Vec::new(),
            ..quick_settings()
        };
        let study = PerturbationStudy {
            geometry: ring(3),
            settings,
            factory: &factory,
            harminv: &pencil,
            backend,
        };
        let report = study.run().unwrap();
        let sweep = &report.perturbation_sweep;
        assert_eq!(sweep.points.len(), 1);
        assert_eq!(sweep.points[0].independent_variable, 1e-3);
        let failed: Vec<usize> = sweep.failures.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![1, 2]);
        assert!(
            sweep.failures[0].reason.contains("grid blew up"),
            "reason: {}",
            sweep.failures[0].reason
        );
    }
}
