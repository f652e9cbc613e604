use ndarray::Array2;

use super::wrap_phase;
use crate::consts::EPSILON_F64;
use crate::frame::Frame;

/// Render a phase map as synthetic differential interference contrast.
///
/// The phase is differentiated along the shear direction (`shear_angle`
/// radians from +x) and mapped to a relief image in [0, 1], flat regions at
/// 0.5. Differences are wrapped so 2 pi jumps in a wrapped map do not show up
/// as ridges.
pub fn synthetic_dic(phase: &Frame, shear_angle: f64) -> Frame {
    let (h, w) = phase.dim();
    if h == 0 || w == 0 {
        return phase.clone();
    }
    let (sin, cos) = shear_angle.sin_cos();
    let p = |r: usize, c: usize| phase.data[[r, c]] as f64;

    let derivative = Array2::from_shape_fn((h, w), |(r, c)| {
        let dx = central_difference(c, w, |i| p(r, i));
        let dy = central_difference(r, h, |i| p(i, c));
        cos * dx + sin * dy
    });

    let peak = derivative.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let data = if peak > EPSILON_F64 {
        derivative.mapv(|d| (0.5 + 0.5 * d / peak) as f32)
    } else {
        Array2::from_elem((h, w), 0.5f32)
    };
    Frame::new(data)
}

/// Central difference inside the line, one-sided at its ends.
fn central_difference(i: usize, n: usize, at: impl Fn(usize) -> f64) -> f64 {
    if n < 2 {
        0.0
    } else if i == 0 {
        wrap_phase(at(1) - at(0))
    } else if i == n - 1 {
        wrap_phase(at(n - 1) - at(n - 2))
    } else {
        0.5 * wrap_phase(at(i + 1) - at(i - 1))
    }
}
