mod common;

use holo_core::compute::cpu::CpuBackend;
use holo_core::error::HoloError;
use holo_core::frame::Frame;
use holo_core::offaxis::{calibrate, demodulate, OffAxisCalibration};
use holo_core::propagate::PixelPitch;
use ndarray::Array2;

use common::off_axis_hologram;

#[test]
fn test_calibration_finds_sideband() {
    let holo = off_axis_hologram(64, 64, 16, 8, 0.5, 0.3);
    let calib = calibrate(&holo, &CpuBackend::new()).unwrap();

    // Sidebands sit at DC +/- (16, 8); both are equally far from DC, so the
    // first in raster order wins.
    assert_eq!(calib.crop_centre, (16, 24));
    // round(|(16, 8)| / 3) = 6
    assert_eq!(calib.crop_radius, (6, 6));
}

#[test]
fn test_calibration_is_deterministic() {
    let holo = off_axis_hologram(96, 80, 20, 12, 0.4, -1.0);
    let backend = CpuBackend::new();
    let a = calibrate(&holo, &backend).unwrap();
    let b = calibrate(&holo, &backend).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_calibration_fails_without_carrier() {
    let flat = Frame::new(Array2::from_elem((32, 32), 1.0));
    match calibrate(&flat, &CpuBackend::new()) {
        Err(HoloError::CalibrationFailure(_)) => {}
        other => panic!("Expected CalibrationFailure, got {other:?}"),
    }
}

#[test]
fn test_demodulated_amplitude() {
    let holo = off_axis_hologram(64, 64, 16, 8, 0.5, 0.3);
    let backend = CpuBackend::new();
    let calib = calibrate(&holo, &backend).unwrap();
    let field = demodulate(&holo, &calib, &backend).unwrap();

    assert_eq!(field.dim(), calib.output_dim());
    let amp = field.amplitude();
    assert!(
        amp.data.iter().all(|v| (v - 0.5).abs() < 1e-4),
        "Object amplitude 0.5 should be recovered"
    );
    // Uniform object phase gives a uniform demodulated phase.
    let phase = field.phase();
    let p0 = phase.data[[0, 0]];
    assert!(phase.data.iter().all(|v| (v - p0).abs() < 1e-4));
}

#[test]
fn test_demodulate_rejects_crop_outside_spectrum() {
    let holo = off_axis_hologram(32, 32, 8, 4, 0.5, 0.0);
    let calib = OffAxisCalibration {
        crop_centre: (30, 30),
        crop_radius: (6, 6),
    };
    assert!(demodulate(&holo, &calib, &CpuBackend::new()).is_err());
}

#[test]
fn test_demodulated_pitch() {
    let calib = OffAxisCalibration {
        crop_centre: (40, 40),
        crop_radius: (8, 16),
    };
    let pitch = calib.demodulated_pitch((128, 64), PixelPitch::square(1e-6));
    // x: 64 / 16 = 4, y: 128 / 32 = 4
    assert!((pitch.x - 4e-6).abs() < 1e-18);
    assert!((pitch.y - 4e-6).abs() < 1e-18);
}
