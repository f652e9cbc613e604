pub mod dic;
pub mod tilt;
pub mod unwrap;

use std::f64::consts::{PI, TAU};

use ndarray::Zip;
use num_complex::Complex64;
use num_traits::Zero;
use tracing::warn;

use crate::config::PhaseOptions;
use crate::consts::EPSILON_F64;
use crate::error::Result;
use crate::frame::{check_same_dim, ComplexFrame, Frame, Roi};

pub use dic::synthetic_dic;
pub use tilt::{obtain_tilt, remove_tilt, TiltMap};
pub use unwrap::unwrap_phase;

/// Wrap an angle into (-pi, pi].
pub fn wrap_phase(v: f64) -> f64 {
    let w = v - TAU * (v / TAU).round();
    if w <= -PI {
        w + TAU
    } else if w > PI {
        w - TAU
    } else {
        w
    }
}

/// Magnitude of the field, optionally flipped as `max - value`.
pub fn amplitude(field: &ComplexFrame, invert: bool) -> Frame {
    let amp = field.amplitude();
    if invert {
        let max = amp.max();
        Frame::new(amp.data.mapv(|v| max - v))
    } else {
        amp
    }
}

/// Remove the phase of `reference` from `field`, leaving amplitude untouched.
pub fn relative_phase(field: &ComplexFrame, reference: &ComplexFrame) -> Result<ComplexFrame> {
    check_same_dim("reference field", field.dim(), reference.dim())?;
    let data = Zip::from(&field.data)
        .and(&reference.data)
        .map_collect(|&f, &r| {
            let mag = r.norm();
            if mag > EPSILON_F64 {
                f * (r.conj() / mag)
            } else {
                f
            }
        });
    Ok(ComplexFrame::new(data))
}

/// Subtract the circular mean phase of `roi` so that region reads zero.
pub fn zero_phase_in_roi(phase: &Frame, roi: &Roi) -> Result<Frame> {
    let roi = roi.validated(phase.height(), phase.width())?;
    let mut acc = Complex64::zero();
    for r in roi.y..roi.y + roi.height {
        for c in roi.x..roi.x + roi.width {
            acc += Complex64::from_polar(1.0, phase.data[[r, c]] as f64);
        }
    }
    let mean = acc.arg();
    Ok(Frame::new(
        phase.data.mapv(|v| wrap_phase(v as f64 - mean) as f32),
    ))
}

/// Phase map of a reconstructed field with the requested post-processing.
///
/// Order: principal phase, ROI zeroing, unwrap, tilt removal, DIC. A tilt map
/// whose size differs from the phase map is skipped.
pub fn extract_phase(field: &ComplexFrame, options: &PhaseOptions, tilt: Option<&TiltMap>) -> Result<Frame> {
    field.validate()?;
    let mut phase = field.phase();

    if let Some(roi) = &options.reference_roi {
        phase = zero_phase_in_roi(&phase, roi)?;
    }

    if options.unwrap {
        phase = unwrap_phase(&phase);
    }

    if options.remove_tilt {
        match tilt {
            Some(map) => match remove_tilt(&phase, map) {
                Some(flat) => {
                    phase = if options.unwrap {
                        flat
                    } else {
                        Frame::new(flat.data.mapv(|v| wrap_phase(v as f64) as f32))
                    };
                }
                None => warn!(
                    phase_height = phase.height(),
                    phase_width = phase.width(),
                    tilt_height = map.plane.height(),
                    tilt_width = map.plane.width(),
                    "Tilt map size differs from phase map; tilt not removed"
                ),
            },
            None => warn!("Tilt removal requested but no tilt map acquired"),
        }
    }

    if options.dic {
        phase = synthetic_dic(&phase, options.dic_shear_angle);
    }

    Ok(phase)
}
