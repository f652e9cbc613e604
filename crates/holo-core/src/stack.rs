use tracing::info;

use crate::config::OpticalConfig;
use crate::error::{HoloError, Result};
use crate::frame::{ComplexFrame, Frame};
use crate::propagate::{PixelPitch, Propagator};

/// Reconstructions of one hologram at a sequence of depths, in depth order.
#[derive(Clone, Debug, Default)]
pub struct DepthStack {
    pub entries: Vec<StackEntry>,
}

#[derive(Clone, Debug)]
pub struct StackEntry {
    /// Meters.
    pub depth: f64,
    /// Refocused complex field, kept so export can choose its own rendering.
    pub field: ComplexFrame,
    /// Rendered amplitude or phase.
    pub frame: Frame,
}

impl DepthStack {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn depths(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.depth).collect()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.entries.iter().map(|e| &e.frame)
    }
}

/// `n` equally spaced depths from `range.0` to `range.1`, both inclusive.
/// `n == 1` yields the start depth alone.
pub fn depth_positions(range: (f64, f64), n: usize) -> Result<Vec<f64>> {
    if n == 0 {
        return Err(HoloError::InvalidConfiguration(
            "depth stack needs at least one depth".into(),
        ));
    }
    if !range.0.is_finite() || !range.1.is_finite() {
        return Err(HoloError::InvalidConfiguration(
            "depth stack range must be finite".into(),
        ));
    }
    if n == 1 {
        return Ok(vec![range.0]);
    }
    let step = (range.1 - range.0) / (n - 1) as f64;
    Ok((0..n)
        .map(|i| if i == n - 1 { range.1 } else { range.0 + step * i as f64 })
        .collect())
}

/// Propagate `field` to every depth of the stack. The forward transform is
/// taken once; each depth costs one transfer-function product and one inverse
/// transform.
pub fn depth_stack(
    propagator: &mut Propagator,
    field: &ComplexFrame,
    optics: &OpticalConfig,
    pitch: PixelPitch,
    range: (f64, f64),
    n: usize,
    render: impl Fn(f64, &ComplexFrame) -> Result<Frame>,
) -> Result<DepthStack> {
    depth_stack_with_progress(propagator, field, optics, pitch, range, n, render, |_| {})
}

#[allow(clippy::too_many_arguments)]
pub fn depth_stack_with_progress(
    propagator: &mut Propagator,
    field: &ComplexFrame,
    optics: &OpticalConfig,
    pitch: PixelPitch,
    range: (f64, f64),
    n: usize,
    render: impl Fn(f64, &ComplexFrame) -> Result<Frame>,
    on_progress: impl Fn(usize),
) -> Result<DepthStack> {
    let depths = depth_positions(range, n)?;
    let prepared = propagator.prepare(field)?;

    let mut entries = Vec::with_capacity(depths.len());
    for (i, depth) in depths.into_iter().enumerate() {
        let (eff_depth, scale) = optics.plane_wave_equivalent(depth, 1.0)?;
        let refocused =
            propagator.propagate_prepared(&prepared, eff_depth, optics.wavelength, pitch.scaled(scale))?;
        let frame = render(depth, &refocused)?;
        entries.push(StackEntry {
            depth,
            field: refocused,
            frame,
        });
        on_progress(i + 1);
    }

    info!(
        count = entries.len(),
        start = range.0,
        end = range.1,
        "Depth stack built"
    );
    Ok(DepthStack { entries })
}
