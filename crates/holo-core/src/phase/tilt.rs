use ndarray::Array2;
use tracing::info;

use crate::error::{HoloError, Result};
use crate::frame::Frame;

/// A least-squares phase plane, stored at the size of the phase map it was
/// fitted to.
#[derive(Clone, Debug, PartialEq)]
pub struct TiltMap {
    pub plane: Frame,
    /// Radians per pixel along x.
    pub gradient_x: f64,
    /// Radians per pixel along y.
    pub gradient_y: f64,
}

impl TiltMap {
    pub fn dim(&self) -> (usize, usize) {
        self.plane.dim()
    }
}

/// Fit `a + bx + cy` to an unwrapped phase map.
pub fn obtain_tilt(unwrapped: &Frame) -> Result<TiltMap> {
    unwrapped.validate()?;
    let (h, w) = unwrapped.dim();
    let n = (h * w) as f64;
    let mx = (w as f64 - 1.0) / 2.0;
    let my = (h as f64 - 1.0) / 2.0;

    let mut mean = 0.0f64;
    let mut sxx = 0.0f64;
    let mut syy = 0.0f64;
    let mut sxy = 0.0f64;
    let mut sxp = 0.0f64;
    let mut syp = 0.0f64;
    for ((r, c), &v) in unwrapped.data.indexed_iter() {
        let x = c as f64 - mx;
        let y = r as f64 - my;
        let p = v as f64;
        mean += p;
        sxx += x * x;
        syy += y * y;
        sxy += x * y;
        sxp += x * p;
        syp += y * p;
    }
    mean /= n;

    let det = sxx * syy - sxy * sxy;
    let (gx, gy) = if det.abs() > 0.0 {
        ((sxp * syy - syp * sxy) / det, (syp * sxx - sxp * sxy) / det)
    } else if sxx > 0.0 {
        (sxp / sxx, 0.0)
    } else if syy > 0.0 {
        (0.0, syp / syy)
    } else {
        (0.0, 0.0)
    };

    let plane = Array2::from_shape_fn((h, w), |(r, c)| {
        (mean + gx * (c as f64 - mx) + gy * (r as f64 - my)) as f32
    });

    info!(gradient_x = gx, gradient_y = gy, "Phase tilt acquired");
    Ok(TiltMap {
        plane: Frame::new(plane),
        gradient_x: gx,
        gradient_y: gy,
    })
}

/// Subtract the tilt plane; `None` if the sizes differ.
pub fn remove_tilt(phase: &Frame, tilt: &TiltMap) -> Option<Frame> {
    if phase.dim() != tilt.dim() {
        return None;
    }
    Some(Frame::new(&phase.data - &tilt.plane.data))
}

/// Like [`remove_tilt`] but reports a size mismatch as an error.
pub fn try_remove_tilt(phase: &Frame, tilt: &TiltMap) -> Result<Frame> {
    remove_tilt(phase, tilt).ok_or(HoloError::DimensionMismatch {
        what: "tilt map",
        expected: phase.dim(),
        found: tilt.dim(),
    })
}
