use ndarray::{Array2, Zip};

use crate::consts::{EPSILON, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{HoloError, Result};
use crate::frame::{check_same_dim, Frame};

/// Subtract a background intensity and/or divide by a normalisation frame.
///
/// Background subtraction runs first, then normalisation. Either reference may
/// be absent; with both absent the frame is returned unchanged.
pub fn correct(frame: &Frame, background: Option<&Frame>, normalise: Option<&Frame>) -> Result<Frame> {
    if frame.is_empty() {
        return Err(HoloError::EmptyInput);
    }

    let mut data = frame.data.clone();

    if let Some(bg) = background {
        check_same_dim("background", frame.dim(), bg.dim())?;
        data -= &bg.data;
    }

    if let Some(norm) = normalise {
        check_same_dim("normalisation frame", frame.dim(), norm.dim())?;
        data = divide_guarded(&data, &norm.data);
    }

    Ok(Frame::new(data))
}

/// Element-wise `a / b`, with `b` kept at least `EPSILON` away from zero.
pub fn divide_guarded(a: &Array2<f32>, b: &Array2<f32>) -> Array2<f32> {
    let zip = Zip::from(a).and(b);
    if a.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_map_collect(|&av, &bv| av / guard(bv))
    } else {
        zip.map_collect(|&av, &bv| av / guard(bv))
    }
}

fn guard(v: f32) -> f32 {
    if v.abs() < EPSILON {
        EPSILON.copysign(v)
    } else {
        v
    }
}

/// Block-average decimation by an integer `factor`. Trailing rows/columns that
/// do not fill a whole block are dropped.
pub fn downsample(frame: &Frame, factor: usize) -> Result<Frame> {
    if factor == 0 {
        return Err(HoloError::InvalidConfiguration(
            "downsample factor must be >= 1".into(),
        ));
    }
    if factor == 1 {
        return Ok(frame.clone());
    }
    let (h, w) = frame.dim();
    let (oh, ow) = (h / factor, w / factor);
    if oh == 0 || ow == 0 {
        return Err(HoloError::InvalidConfiguration(format!(
            "downsample factor {factor} too large for {w}x{h} frame"
        )));
    }

    let inv = 1.0 / (factor * factor) as f32;
    let data = Array2::from_shape_fn((oh, ow), |(r, c)| {
        let mut sum = 0.0f32;
        for dr in 0..factor {
            for dc in 0..factor {
                sum += frame.data[[r * factor + dr, c * factor + dc]];
            }
        }
        sum * inv
    });
    Ok(Frame::new(data))
}
