mod common;

use std::sync::Arc;

use holo_core::compute::cpu::CpuBackend;
use holo_core::config::OpticalConfig;
use holo_core::focus::{auto_focus, auto_focus_with_progress, FocusMetric, FocusParams};
use holo_core::frame::{ComplexFrame, Roi};
use holo_core::propagate::{PixelPitch, Propagator};
use ndarray::Array2;
use num_complex::Complex64;

use common::test_pattern;

const WAVELENGTH: f64 = 0.5e-6;
const PITCH: f64 = 2.0e-6;

fn optics() -> OpticalConfig {
    OpticalConfig {
        wavelength: WAVELENGTH,
        pixel_size: PITCH,
        ..OpticalConfig::default()
    }
}

/// The test pattern as a field, defocused by `depth`.
fn defocused(depth: f64) -> (Propagator, ComplexFrame) {
    let mut prop = Propagator::new(Arc::new(CpuBackend::new()));
    let sharp = test_pattern(64, 64).to_field();
    let blurred = prop
        .propagate(&sharp, depth, WAVELENGTH, PixelPitch::square(PITCH))
        .unwrap();
    (prop, blurred)
}

#[test]
fn test_autofocus_recovers_correcting_depth() {
    let d0 = 100e-6;
    let (mut prop, field) = defocused(d0);
    let params = FocusParams {
        depth_range: (-200e-6, 200e-6),
        coarse_search_interval: 20,
        metric: FocusMetric::Variance,
        ..FocusParams::default()
    };

    let result = auto_focus(&mut prop, &field, &optics(), PixelPitch::square(PITCH), &params).unwrap();
    let tolerance = 0.01 * 400e-6;
    assert!(
        (result.depth + d0).abs() < tolerance,
        "Expected focus near {} m, got {} m",
        -d0,
        result.depth
    );
}

#[test]
fn test_autofocus_off_grid_depth() {
    // Not a coarse grid point: the fine search has to find it.
    let d0 = -37e-6;
    let (mut prop, field) = defocused(d0);
    let params = FocusParams {
        depth_range: (-100e-6, 100e-6),
        coarse_search_interval: 8,
        metric: FocusMetric::Variance,
        ..FocusParams::default()
    };
    let result = auto_focus(&mut prop, &field, &optics(), PixelPitch::square(PITCH), &params).unwrap();
    assert!(
        (result.depth - 37e-6).abs() < 2e-6,
        "Expected focus near 37 um, got {} um",
        result.depth * 1e6
    );
}

#[test]
fn test_ties_prefer_range_centre() {
    let mut prop = Propagator::new(Arc::new(CpuBackend::new()));
    let flat = ComplexFrame::new(Array2::from_elem((16, 16), Complex64::new(1.0, 0.0)));
    let params = FocusParams {
        depth_range: (-100e-6, 100e-6),
        coarse_search_interval: 10,
        metric: FocusMetric::Variance,
        ..FocusParams::default()
    };
    let result = auto_focus(&mut prop, &flat, &optics(), PixelPitch::square(PITCH), &params).unwrap();
    assert!(result.depth.abs() < 1e-9, "Tied scores should pick the centre, got {}", result.depth);
}

#[test]
fn test_progress_counts_evaluations() {
    let (mut prop, field) = defocused(20e-6);
    let params = FocusParams::new((-50e-6, 50e-6), 5);
    let calls = std::cell::Cell::new(0usize);
    auto_focus_with_progress(&mut prop, &field, &optics(), PixelPitch::square(PITCH), &params, |done| {
        calls.set(done)
    })
    .unwrap();
    assert!(calls.get() >= 6, "Coarse sweep alone scores 6 depths");
    assert!(calls.get() <= params.evaluation_budget());
}

#[test]
fn test_roi_is_validated() {
    let (mut prop, field) = defocused(10e-6);
    let params = FocusParams {
        roi: Some(Roi::new(60, 60, 10, 10)),
        ..FocusParams::new((-20e-6, 20e-6), 4)
    };
    assert!(auto_focus(&mut prop, &field, &optics(), PixelPitch::square(PITCH), &params).is_err());

    let params = FocusParams {
        roi: Some(Roi::new(8, 8, 32, 32)),
        margin: 8,
        ..FocusParams::new((-20e-6, 20e-6), 4)
    };
    let result = auto_focus(&mut prop, &field, &optics(), PixelPitch::square(PITCH), &params).unwrap();
    assert!((-20e-6..=20e-6).contains(&result.depth));
}

#[test]
fn test_zero_divisions_rejected() {
    let (mut prop, field) = defocused(10e-6);
    let params = FocusParams::new((-20e-6, 20e-6), 0);
    assert!(auto_focus(&mut prop, &field, &optics(), PixelPitch::square(PITCH), &params).is_err());
}
