mod common;

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use holo_core::compute::accelerated::AcceleratedBackend;
use holo_core::compute::cpu::CpuBackend;
use holo_core::compute::ComputeBackend;
use holo_core::config::OpticalConfig;
use holo_core::propagate::{transfer_function, PixelPitch, Propagator};

use common::{max_abs_diff, random_field};

const WAVELENGTH: f64 = 0.5e-6;

fn propagator() -> Propagator {
    Propagator::new(Arc::new(CpuBackend::new()))
}

#[test]
fn test_round_trip_restores_field() {
    let field = random_field(64, 64, 7);
    let pitch = PixelPitch::square(1.0e-6);
    let mut prop = propagator();

    let forward = prop.propagate(&field, 150e-6, WAVELENGTH, pitch).unwrap();
    let back = prop.propagate(&forward, -150e-6, WAVELENGTH, pitch).unwrap();

    let err = max_abs_diff(&field, &back);
    assert!(err < 1e-9, "Round trip error {err} too large");
    assert!(
        max_abs_diff(&field, &forward) > 1e-3,
        "Propagation should change the field"
    );
}

#[test]
fn test_round_trip_restores_large_field() {
    let field = random_field(256, 256, 19);
    let pitch = PixelPitch::square(0.8e-6);
    let mut prop = propagator();

    let forward = prop.propagate(&field, 400e-6, WAVELENGTH, pitch).unwrap();
    let back = prop.propagate(&forward, -400e-6, WAVELENGTH, pitch).unwrap();
    let err = max_abs_diff(&field, &back);
    assert!(err < 1e-9, "Round trip error {err} too large");
}

#[test]
fn test_round_trip_non_square() {
    let field = random_field(48, 80, 11);
    let pitch = PixelPitch { x: 1.2e-6, y: 0.9e-6 };
    let mut prop = propagator();

    let forward = prop.propagate(&field, -80e-6, WAVELENGTH, pitch).unwrap();
    let back = prop.propagate(&forward, 80e-6, WAVELENGTH, pitch).unwrap();
    assert!(max_abs_diff(&field, &back) < 1e-9);
}

#[test]
fn test_zero_depth_is_identity() {
    let field = random_field(32, 32, 3);
    let mut prop = propagator();
    let out = prop
        .propagate(&field, 0.0, WAVELENGTH, PixelPitch::square(1e-6))
        .unwrap();
    assert_eq!(out, field, "Depth zero must return the input unchanged");
}

#[test]
fn test_prepared_matches_direct() {
    let field = random_field(32, 40, 5);
    let pitch = PixelPitch::square(2e-6);
    let mut prop = propagator();

    let prepared = prop.prepare(&field).unwrap();
    for depth in [-50e-6, 20e-6, 90e-6] {
        let a = prop.propagate(&field, depth, WAVELENGTH, pitch).unwrap();
        let b = prop.propagate_prepared(&prepared, depth, WAVELENGTH, pitch).unwrap();
        assert!(max_abs_diff(&a, &b) < 1e-12, "Mismatch at depth {depth}");
    }
}

#[test]
fn test_evanescent_bins_are_zeroed() {
    // Pitch below half a wavelength puts the outer bins past the cutoff.
    let h = transfer_function((16, 16), 1.0e-6, PixelPitch::square(0.2e-6), 10e-6);
    let nyquist = h[[8, 8]];
    assert_eq!(nyquist.norm(), 0.0, "Evanescent bin should be zero");
    assert_abs_diff_eq!(h[[0, 0]].norm(), 1.0, epsilon = 1e-12);
    assert!(h.iter().all(|v| v.re.is_finite() && v.im.is_finite()));
}

#[test]
fn test_rejects_bad_optics() {
    let field = random_field(8, 8, 1);
    let mut prop = propagator();
    assert!(prop.propagate(&field, 1e-6, 0.0, PixelPitch::square(1e-6)).is_err());
    assert!(prop.propagate(&field, 1e-6, WAVELENGTH, PixelPitch::square(-1.0)).is_err());
}

#[test]
fn test_backends_agree() {
    let field = random_field(24, 36, 42);
    let cpu = CpuBackend::new();
    let fast = AcceleratedBackend::new();

    let a = cpu.fft2d(&field.data);
    let b = fast.fft2d(&field.data);
    let diff = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max);
    assert!(diff < 1e-9, "Backends differ by {diff}");
    assert!(fast.is_accelerated());
    assert!(!cpu.is_accelerated());

    let back = fast.ifft2d(&b);
    let err = field
        .data
        .iter()
        .zip(back.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max);
    assert!(err < 1e-9);
}

#[test]
fn test_curvature_scaling() {
    let plane = OpticalConfig::default();
    assert_eq!(plane.plane_wave_equivalent(100e-6, 1e-6).unwrap(), (100e-6, 1e-6));

    let diverging = OpticalConfig {
        source_distance: Some(1e-3),
        ..OpticalConfig::default()
    };
    let (z, p) = diverging.plane_wave_equivalent(200e-6, 1e-6).unwrap();
    // M = L / (L - z) = 1.25
    assert_abs_diff_eq!(z, 160e-6, epsilon = 1e-15);
    assert_abs_diff_eq!(p, 0.8e-6, epsilon = 1e-18);

    assert!(diverging.plane_wave_equivalent(2e-3, 1e-6).is_err());
}
