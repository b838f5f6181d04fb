//! Cylindrical FDTD on the reference ring (a = 1, w = 1, n = 3.4, m = 3).
//!
//! The well-known broadband result for this cavity is a whispering-gallery
//! mode near f = 0.118. At resolution 20 the staggered grid should land
//! within a few percent of it.

use ringpert_compute::SerialBackend;
use ringpert_core::harminv::MatrixPencil;
use ringpert_core::mode_finder::{ModeFinder, ModeFinderSettings};
use ringpert_core::solver::fdtd::CylindricalFdtd;
use ringpert_core::solver::FieldSolver;
use ringpert_core::study::{PerturbationStudy, StudySettings};
use ringpert_core::types::{ExcitationBand, SimulationSettings};
use ringpert_geometry::{RingGeometry, Symmetry};

const RESOLUTION: f64 = 20.0;

fn ring() -> RingGeometry {
    RingGeometry::new(1.0, 1.0, 3.4, 4.0, 2.0, Symmetry::Azimuthal { m: 3 }).unwrap()
}

fn fdtd() -> Box<dyn FieldSolver> {
    Box::new(CylindricalFdtd::default())
}

#[test]
fn test_fdtd_finds_whispering_gallery_mode() {
    let geometry = ring();
    let pencil = MatrixPencil::default();
    let finder = ModeFinder::new(&pencil, ModeFinderSettings::default());
    let config = SimulationSettings::default().config_for(&geometry, RESOLUTION);
    let band = ExcitationBand::new(0.15, 0.1).unwrap();

    let discovery = finder
        .discover(&CylindricalFdtd::default(), &geometry, &config, &band)
        .unwrap();

    eprintln!("{:>12} {:>10} {:>12} {:>10}", "f", "Q", "|amp|", "error");
    for mode in &discovery.candidates {
        eprintln!(
            "{:12.6} {:10.1} {:12.3e} {:10.2e}",
            mode.frequency, mode.quality_factor, mode.amplitude, mode.error
        );
    }

    let selected = discovery.mode;
    assert!(
        (selected.frequency - 0.118).abs() < 0.006,
        "selected f = {} in {:?}",
        selected.frequency,
        discovery.candidates
    );
    assert!(selected.quality_factor > 10.0, "Q = {}", selected.quality_factor);
    // the whispering-gallery mode dominates every other candidate
    for other in discovery
        .candidates
        .iter()
        .filter(|m| m.frequency != selected.frequency)
    {
        assert!(
            selected.quality_factor > other.quality_factor,
            "f={} Q={} outranks the selected mode (Q={})",
            other.frequency,
            other.quality_factor,
            selected.quality_factor
        );
    }
}

#[test]
fn test_fdtd_growing_ring_lowers_frequency() {
    let settings = StudySettings {
        baseline_resolution: RESOLUTION,
        perturbations: vec![0.05],
        resolutions: Vec::new(),
        ..StudySettings::default()
    };
    let pencil = MatrixPencil::default();
    let study = PerturbationStudy {
        geometry: ring(),
        settings,
        factory: &fdtd,
        harminv: &pencil,
        backend: &SerialBackend,
    };
    let report = study.run().unwrap();
    let estimate = report.baseline.estimate;
    assert!(estimate.dw_dr.is_finite());
    assert!(estimate.dw_dr < 0.0);
    assert!(estimate.numerator > 0.0 && estimate.denominator > 0.0);

    let sweep = &report.perturbation_sweep;
    assert!(sweep.failures.is_empty(), "failures: {:?}", sweep.failures);
    let point = &sweep.points[0];
    eprintln!(
        "baseline {:.6}, dr=0.05 measured {:.6}, predicted {:.6}",
        estimate.baseline_frequency, point.measured_frequency, point.predicted_frequency
    );
    assert!(point.measured_frequency < estimate.baseline_frequency);
}
