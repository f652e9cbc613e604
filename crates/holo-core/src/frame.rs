use ndarray::{s, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{HoloError, Result};
use crate::phase::wrap_phase;

/// A real-valued 2D frame: raw hologram intensity, amplitude or phase.
/// Shape = (height, width), row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub data: Array2<f32>,
}

impl Frame {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// (height, width)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reject empty and non-finite frames before any spectral work.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(HoloError::EmptyInput);
        }
        if self.data.iter().any(|v| !v.is_finite()) {
            return Err(HoloError::NonFiniteInput);
        }
        Ok(())
    }

    /// Promote to a complex field with zero imaginary part.
    pub fn to_field(&self) -> ComplexFrame {
        ComplexFrame::new(self.data.mapv(|v| Complex64::new(v as f64, 0.0)))
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }
}

/// A complex-valued 2D field: the demodulated or refocused wavefront.
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexFrame {
    pub data: Array2<Complex64>,
}

impl ComplexFrame {
    pub fn new(data: Array2<Complex64>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(HoloError::EmptyInput);
        }
        if self.data.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
            return Err(HoloError::NonFiniteInput);
        }
        Ok(())
    }

    /// Magnitude of every sample.
    pub fn amplitude(&self) -> Frame {
        Frame::new(self.data.mapv(|v| v.norm() as f32))
    }

    /// Principal argument of every sample, in (-pi, pi].
    pub fn phase(&self) -> Frame {
        Frame::new(self.data.mapv(|v| wrap_phase(v.arg()) as f32))
    }

    pub fn intensity(&self) -> Frame {
        Frame::new(self.data.mapv(|v| v.norm_sqr() as f32))
    }

    pub fn crop(&self, roi: &Roi) -> Result<ComplexFrame> {
        let roi = roi.validated(self.height(), self.width())?;
        Ok(ComplexFrame::new(
            self.data
                .slice(s![roi.y..roi.y + roi.height, roi.x..roi.x + roi.width])
                .to_owned(),
        ))
    }
}

/// A rectangular region in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check the region is non-empty and lies inside a `h`x`w` frame.
    pub fn validated(&self, h: usize, w: usize) -> Result<Roi> {
        if self.width == 0 || self.height == 0 {
            return Err(HoloError::InvalidConfiguration(
                "ROI width and height must be > 0".into(),
            ));
        }
        if self.x + self.width > w || self.y + self.height > h {
            return Err(HoloError::InvalidConfiguration(format!(
                "ROI ({},{} {}x{}) exceeds frame dimensions ({w}x{h})",
                self.x, self.y, self.width, self.height
            )));
        }
        Ok(*self)
    }

    /// Grow by `margin` pixels on every side, clipped to a `h`x`w` frame.
    pub fn expanded(&self, margin: usize, h: usize, w: usize) -> Roi {
        let x0 = self.x.saturating_sub(margin);
        let y0 = self.y.saturating_sub(margin);
        let x1 = (self.x + self.width + margin).min(w);
        let y1 = (self.y + self.height + margin).min(h);
        Roi::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// This region expressed relative to the origin of `outer`.
    pub fn relative_to(&self, outer: &Roi) -> Roi {
        Roi::new(
            self.x - outer.x,
            self.y - outer.y,
            self.width,
            self.height,
        )
    }
}

pub fn check_same_dim(what: &'static str, expected: (usize, usize), found: (usize, usize)) -> Result<()> {
    if expected != found {
        return Err(HoloError::DimensionMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}
