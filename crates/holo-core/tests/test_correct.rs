mod common;

use holo_core::correct::{correct, downsample};
use holo_core::error::HoloError;
use holo_core::frame::Frame;
use ndarray::Array2;

use common::test_pattern;

#[test]
fn test_background_self_subtraction_is_zero() {
    let frame = test_pattern(32, 32);
    let out = correct(&frame, Some(&frame), None).unwrap();
    assert!(out.data.iter().all(|v| v.abs() < 1e-7));
}

#[test]
fn test_no_references_is_noop() {
    let frame = test_pattern(16, 24);
    assert_eq!(correct(&frame, None, None).unwrap(), frame);
}

#[test]
fn test_normalise_divides() {
    let frame = Frame::new(Array2::from_elem((8, 8), 0.6));
    let norm = Frame::new(Array2::from_elem((8, 8), 2.0));
    let out = correct(&frame, None, Some(&norm)).unwrap();
    assert!(out.data.iter().all(|v| (v - 0.3).abs() < 1e-6));
}

#[test]
fn test_normalise_by_zero_stays_finite() {
    let frame = Frame::new(Array2::from_elem((4, 4), 1.0));
    let norm = Frame::new(Array2::zeros((4, 4)));
    let out = correct(&frame, None, Some(&norm)).unwrap();
    assert!(out.data.iter().all(|v| v.is_finite()));
}

#[test]
fn test_background_size_mismatch() {
    let frame = test_pattern(16, 16);
    let bg = test_pattern(16, 8);
    match correct(&frame, Some(&bg), None) {
        Err(HoloError::DimensionMismatch { expected, found, .. }) => {
            assert_eq!(expected, (16, 16));
            assert_eq!(found, (16, 8));
        }
        other => panic!("Expected DimensionMismatch, got {other:?}"),
    }
}

#[test]
fn test_downsample_block_average() {
    let data = Array2::from_shape_fn((4, 6), |(r, c)| (r * 6 + c) as f32);
    let out = downsample(&Frame::new(data), 2).unwrap();
    assert_eq!(out.dim(), (2, 3));
    // Block (0..2, 0..2) = {0, 1, 6, 7}
    assert!((out.data[[0, 0]] - 3.5).abs() < 1e-6);
    assert!(downsample(&out, 0).is_err());
    assert!(downsample(&out, 5).is_err());
}
