mod common;

use std::f64::consts::PI;

use holo_core::config::PhaseOptions;
use holo_core::frame::{ComplexFrame, Frame, Roi};
use holo_core::phase::tilt::try_remove_tilt;
use holo_core::phase::{
    extract_phase, obtain_tilt, relative_phase, remove_tilt, synthetic_dic, unwrap_phase, wrap_phase,
    zero_phase_in_roi,
};
use ndarray::Array2;
use num_complex::Complex64;

use common::{phase_ramp, random_field};

fn wrapped(frame: &Frame) -> Frame {
    Frame::new(frame.data.mapv(|v| wrap_phase(v as f64) as f32))
}

fn assert_constant_offset(a: &Frame, b: &Frame, tol: f32) {
    let offset = a.data[[0, 0]] - b.data[[0, 0]];
    for (x, y) in a.data.iter().zip(b.data.iter()) {
        assert!(
            (x - y - offset).abs() < tol,
            "Offset {} differs from {offset}",
            x - y
        );
    }
}

#[test]
fn test_unwrap_recovers_ramp() {
    let ramp = phase_ramp(40, 48, 0.9, -0.6);
    let unwrapped = unwrap_phase(&wrapped(&ramp));
    assert_constant_offset(&unwrapped, &ramp, 1e-3);

    let offset = (unwrapped.data[[0, 0]] - ramp.data[[0, 0]]) as f64;
    let cycles = offset / (2.0 * PI);
    assert!((cycles - cycles.round()).abs() < 1e-3, "Offset must be a multiple of 2 pi");
}

#[test]
fn test_unwrap_confines_isolated_noise() {
    let ramp = phase_ramp(40, 48, 0.6, 0.4);
    let mut noisy = wrapped(&ramp);
    let corrupted = [(12, 17), (29, 33)];
    for &(r, c) in &corrupted {
        noisy.data[[r, c]] = wrap_phase(noisy.data[[r, c]] as f64 + 2.5) as f32;
    }

    let unwrapped = unwrap_phase(&noisy);
    let offset = unwrapped.data[[0, 0]] - ramp.data[[0, 0]];
    let mut off_ramp = Vec::new();
    for ((r, c), &v) in unwrapped.data.indexed_iter() {
        if (v - ramp.data[[r, c]] - offset).abs() > 1.0 {
            off_ramp.push((r, c));
        }
    }
    assert!(
        off_ramp.iter().all(|p| corrupted.contains(p)),
        "Noise spread to {off_ramp:?}"
    );
    assert!(off_ramp.len() <= corrupted.len());
}

#[test]
fn test_complex_phase_excludes_minus_pi() {
    let field = ComplexFrame::new(Array2::from_elem((2, 2), Complex64::new(-1.0, -0.0)));
    let phase = field.phase();
    assert!(phase.data.iter().all(|&v| v > 0.0 && (v as f64 - PI).abs() < 1e-6));
}

#[test]
fn test_unwrap_of_small_phase_is_unchanged() {
    let small = phase_ramp(16, 16, 0.01, 0.02);
    let out = unwrap_phase(&small);
    assert_constant_offset(&out, &small, 1e-5);
}

#[test]
fn test_tilt_fit_and_removal() {
    let ramp = phase_ramp(32, 24, 0.25, -0.1);
    let tilt = obtain_tilt(&ramp).unwrap();
    assert!((tilt.gradient_x - 0.25).abs() < 1e-6);
    assert!((tilt.gradient_y + 0.1).abs() < 1e-6);

    let flat = remove_tilt(&ramp, &tilt).unwrap();
    assert!(flat.data.iter().all(|v| v.abs() < 1e-4));
}

#[test]
fn test_tilt_size_mismatch_is_skipped() {
    let tilt = obtain_tilt(&phase_ramp(16, 16, 0.1, 0.1)).unwrap();
    let other = phase_ramp(8, 16, 0.1, 0.1);
    assert!(remove_tilt(&other, &tilt).is_none());
    assert!(try_remove_tilt(&other, &tilt).is_err());

    // The pipeline leaves the phase alone rather than failing.
    let field = ComplexFrame::new(other.data.mapv(|p| Complex64::from_polar(1.0, p as f64)));
    let options = PhaseOptions {
        remove_tilt: true,
        ..PhaseOptions::default()
    };
    let out = extract_phase(&field, &options, Some(&tilt)).unwrap();
    assert_eq!(out.dim(), (8, 16));
    assert!((out.data[[4, 4]] - other.data[[4, 4]]).abs() < 1e-5);
}

#[test]
fn test_relative_phase_cancels_reference() {
    let reference = random_field(16, 16, 9);
    let object = ComplexFrame::new(Array2::from_elem((16, 16), Complex64::from_polar(2.0, 0.4)));
    let combined = ComplexFrame::new(&object.data * &reference.data.mapv(|r| r / r.norm()));

    let out = relative_phase(&combined, &reference).unwrap();
    assert!(out
        .data
        .iter()
        .all(|v| (v.norm() - 2.0).abs() < 1e-9 && (v.arg() - 0.4).abs() < 1e-9));
}

#[test]
fn test_roi_phase_reads_zero() {
    let phase = Frame::new(Array2::from_elem((10, 10), 2.5));
    let out = zero_phase_in_roi(&phase, &Roi::new(2, 2, 4, 4)).unwrap();
    assert!(out.data.iter().all(|v| v.abs() < 1e-5));
    assert!(zero_phase_in_roi(&phase, &Roi::new(8, 8, 4, 4)).is_err());
}

#[test]
fn test_dic_flat_phase_is_mid_grey() {
    let out = synthetic_dic(&Frame::new(Array2::zeros((12, 12))), 0.0);
    assert!(out.data.iter().all(|&v| v == 0.5));
}

#[test]
fn test_dic_follows_shear_direction() {
    let ramp = phase_ramp(16, 16, 0.3, 0.0);
    let along = synthetic_dic(&ramp, 0.0);
    assert!(along.data.iter().all(|v| (v - 1.0).abs() < 1e-5));

    let across = synthetic_dic(&ramp, PI / 2.0);
    assert!(across.data.iter().all(|&v| v == 0.5));

    let opposed = synthetic_dic(&ramp, PI);
    assert!(opposed.data.iter().all(|v| v.abs() < 1e-5));
}

#[test]
fn test_extract_wrapped_phase_range() {
    let field = random_field(20, 20, 17);
    let out = extract_phase(&field, &PhaseOptions::default(), None).unwrap();
    assert!(out
        .data
        .iter()
        .all(|&v| v > -std::f32::consts::PI - 1e-6 && v <= std::f32::consts::PI + 1e-6));
}
