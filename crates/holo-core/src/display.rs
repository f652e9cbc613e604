use std::f32::consts::PI;

use crate::config::{OutputMode, ReconstructionConfig};
use crate::frame::Frame;

/// How a processed frame maps onto [0, 1] for display or export.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayScale {
    /// Stretch min..max to 0..1.
    MinMax,
    /// Wrapped phase: (phi + pi) / 2 pi.
    WrappedPhase,
    /// Already in [0, 1]; clamp only.
    Unit,
}

impl DisplayScale {
    /// Scale matching what `Reconstructor::process` produces for `config`.
    pub fn for_config(config: &ReconstructionConfig) -> Self {
        match config.output {
            OutputMode::Phase if config.phase.dic => Self::Unit,
            OutputMode::Phase if config.phase.unwrap => Self::MinMax,
            OutputMode::Phase => Self::WrappedPhase,
            OutputMode::Amplitude | OutputMode::Spectrum => Self::MinMax,
        }
    }
}

pub fn to_display(frame: &Frame, scale: DisplayScale) -> Frame {
    let data = match scale {
        DisplayScale::MinMax => {
            let (min, max) = (frame.min(), frame.max());
            let range = max - min;
            if range > 0.0 {
                frame.data.mapv(|v| (v - min) / range)
            } else {
                frame.data.mapv(|_| 0.0)
            }
        }
        DisplayScale::WrappedPhase => frame.data.mapv(|v| ((v + PI) / (2.0 * PI)).clamp(0.0, 1.0)),
        DisplayScale::Unit => frame.data.mapv(|v| v.clamp(0.0, 1.0)),
    };
    Frame::new(data)
}
