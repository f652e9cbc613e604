//! Edge apodisation applied to a field before refocusing.
//!
//! A hard frame edge diffracts into ringing once the field is propagated. The
//! mask rolls the field off to zero with a raised-cosine skin of `thickness`
//! pixels.

use std::f64::consts::PI;

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HoloError, Result};
use crate::frame::{check_same_dim, ComplexFrame, Frame};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowShape {
    #[default]
    None,
    Circle,
    Rectangle,
}

impl std::fmt::Display for WindowShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Circle => write!(f, "Circle"),
            Self::Rectangle => write!(f, "Rectangle"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub shape: WindowShape,
    /// Width of the cosine skin in pixels. Zero gives a hard edge.
    pub thickness: f64,
    /// Derive the mask extent from the frame size instead of `radius`.
    pub auto_sized: bool,
    /// Circle radius, or rectangle half-extent, in pixels when not auto-sized.
    pub radius: f64,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            shape: WindowShape::None,
            thickness: 10.0,
            auto_sized: true,
            radius: 0.0,
        }
    }
}

impl WindowSpec {
    pub fn is_active(&self) -> bool {
        self.shape != WindowShape::None
    }
}

/// Build a mask for a `dim` = (height, width) frame. Values lie in [0, 1].
pub fn build_mask(spec: &WindowSpec, dim: (usize, usize)) -> Result<Frame> {
    let (h, w) = dim;
    if h == 0 || w == 0 {
        return Err(HoloError::EmptyInput);
    }
    let cy = (h / 2) as f64;
    let cx = (w / 2) as f64;
    let t = spec.thickness;

    let data = match spec.shape {
        WindowShape::None => Array2::<f32>::ones((h, w)),
        WindowShape::Circle => {
            let radius = if spec.auto_sized {
                h.min(w) as f64 / 2.0
            } else {
                spec.radius
            };
            check_extent(radius, t)?;
            Array2::from_shape_fn((h, w), |(row, col)| {
                let dy = row as f64 - cy;
                let dx = col as f64 - cx;
                let r = (dx * dx + dy * dy).sqrt();
                edge_taper(radius - r, t) as f32
            })
        }
        WindowShape::Rectangle => {
            let (half_y, half_x) = if spec.auto_sized {
                (h as f64 / 2.0, w as f64 / 2.0)
            } else {
                (spec.radius, spec.radius)
            };
            check_extent(half_y.min(half_x), t)?;
            Array2::from_shape_fn((h, w), |(row, col)| {
                let wy = edge_taper(half_y - (row as f64 - cy).abs(), t);
                let wx = edge_taper(half_x - (col as f64 - cx).abs(), t);
                (wy * wx) as f32
            })
        }
    };

    Ok(Frame::new(data))
}

fn check_extent(extent: f64, thickness: f64) -> Result<()> {
    if !(extent > 0.0) {
        return Err(HoloError::InvalidConfiguration(format!(
            "window radius must be > 0 (got {extent})"
        )));
    }
    if thickness < 0.0 || thickness > extent {
        return Err(HoloError::InvalidConfiguration(format!(
            "window thickness {thickness} px exceeds window radius {extent} px"
        )));
    }
    Ok(())
}

/// Raised-cosine roll-off as a function of distance inside the edge.
fn edge_taper(inside: f64, thickness: f64) -> f64 {
    if inside <= 0.0 {
        0.0
    } else if inside >= thickness {
        1.0
    } else {
        0.5 * (1.0 - (PI * inside / thickness).cos())
    }
}

/// Multiply a field by a real mask of the same size.
pub fn apply_window(field: &ComplexFrame, mask: &Frame) -> Result<ComplexFrame> {
    check_same_dim("window mask", field.dim(), mask.dim())?;
    let data = Zip::from(&field.data)
        .and(&mask.data)
        .map_collect(|&v, &m| v * m as f64);
    Ok(ComplexFrame::new(data))
}

/// Mask cached against the frame size and spec that produced it.
#[derive(Default)]
pub struct WindowCache {
    key: Option<((usize, usize), WindowSpec)>,
    mask: Option<Frame>,
}

impl WindowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mask for this spec and size; `None` when windowing is off.
    pub fn get(&mut self, spec: &WindowSpec, dim: (usize, usize)) -> Result<Option<&Frame>> {
        if !spec.is_active() {
            return Ok(None);
        }
        let key = (dim, *spec);
        if self.key.as_ref() != Some(&key) || self.mask.is_none() {
            debug!(shape = %spec.shape, height = dim.0, width = dim.1, "Rebuilding window mask");
            self.mask = Some(build_mask(spec, dim)?);
            self.key = Some(key);
        }
        Ok(self.mask.as_ref())
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.mask = None;
    }
}
