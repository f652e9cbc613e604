#![allow(dead_code)]

use std::f64::consts::TAU;

use ndarray::Array2;
use num_complex::Complex64;

use holo_core::frame::{ComplexFrame, Frame};

/// Bright rectangles on a dark background: a sharp, non-negative amplitude
/// object.
pub fn test_pattern(h: usize, w: usize) -> Frame {
    let mut data = Array2::<f32>::from_elem((h, w), 0.1);
    let blocks = [
        (h / 4, w / 4, h / 8, w / 6),
        (h / 2, w / 2 + 2, h / 5, w / 10),
        (3 * h / 5, w / 6, h / 10, w / 4),
    ];
    for (r0, c0, bh, bw) in blocks {
        for r in r0..(r0 + bh).min(h) {
            for c in c0..(c0 + bw).min(w) {
                data[[r, c]] = 1.0;
            }
        }
    }
    Frame::new(data)
}

/// Deterministic pseudo-random value in [0, 1).
pub fn lcg(state: &mut u64) -> f64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*state >> 11) as f64 / (1u64 << 53) as f64
}

/// Complex field with random amplitude in [0.5, 1.5) and random phase.
pub fn random_field(h: usize, w: usize, seed: u64) -> ComplexFrame {
    let mut state = seed;
    ComplexFrame::new(Array2::from_shape_fn((h, w), |_| {
        let amp = 0.5 + lcg(&mut state);
        let phase = TAU * lcg(&mut state);
        Complex64::from_polar(amp, phase)
    }))
}

/// Off-axis hologram `|1 + a exp(i (carrier + phase))|^2` with the carrier
/// on integer spectrum bins (`kx`, `ky`).
pub fn off_axis_hologram(h: usize, w: usize, kx: usize, ky: usize, a: f64, phase: f64) -> Frame {
    Frame::new(Array2::from_shape_fn((h, w), |(r, c)| {
        let carrier = TAU * (kx as f64 * c as f64 / w as f64 + ky as f64 * r as f64 / h as f64);
        let v = Complex64::new(1.0, 0.0) + Complex64::from_polar(a, carrier + phase);
        v.norm_sqr() as f32
    }))
}

/// Linear phase `gx * col + gy * row` in radians.
pub fn phase_ramp(h: usize, w: usize, gx: f64, gy: f64) -> Frame {
    Frame::new(Array2::from_shape_fn((h, w), |(r, c)| (gx * c as f64 + gy * r as f64) as f32))
}

/// Largest absolute difference between two complex fields.
pub fn max_abs_diff(a: &ComplexFrame, b: &ComplexFrame) -> f64 {
    a.data
        .iter()
        .zip(b.data.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}
