use serde::{Deserialize, Serialize};

use crate::compute::DevicePreference;
use crate::error::{HoloError, Result};
use crate::frame::Roi;
use crate::offaxis::OffAxisCalibration;
use crate::window::{WindowShape, WindowSpec};

/// Micrometres to meters. All lengths inside the core are meters.
pub fn um_to_m(um: f64) -> f64 {
    um * 1e-6
}

/// Meters to micrometres.
pub fn m_to_um(m: f64) -> f64 {
    m * 1e6
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Inline,
    OffAxis,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline => write!(f, "Inline"),
            Self::OffAxis => write!(f, "Off-axis"),
        }
    }
}

/// What the reconstructor hands back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    #[default]
    Amplitude,
    Phase,
    /// Centred log-magnitude spectrum of the corrected hologram.
    Spectrum,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Amplitude => write!(f, "Amplitude"),
            Self::Phase => write!(f, "Phase"),
            Self::Spectrum => write!(f, "Spectrum"),
        }
    }
}

/// Physical sampling and propagation parameters. Lengths in meters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalConfig {
    pub wavelength: f64,
    pub pixel_size: f64,
    /// Signed propagation distance; positive is away from the sensor.
    pub depth: f64,
    pub downsample: usize,
    pub mode: Mode,
    /// Sensor-to-point-source distance for diverging illumination. `None`
    /// means plane-wave illumination.
    pub source_distance: Option<f64>,
}

impl Default for OpticalConfig {
    fn default() -> Self {
        Self {
            wavelength: 0.633e-6,
            pixel_size: 1.0e-6,
            depth: 0.0,
            downsample: 1,
            mode: Mode::Inline,
            source_distance: None,
        }
    }
}

impl OpticalConfig {
    /// Pixel pitch after decimation.
    pub fn sampled_pixel_size(&self) -> f64 {
        self.pixel_size * self.downsample.max(1) as f64
    }

    /// Depth and pixel pitch to hand to a plane-wave propagator.
    ///
    /// With a point source at distance L, the Fresnel scaling theorem maps a
    /// propagation over `z` to a plane-wave propagation over `z / M` at pitch
    /// `p / M`, where `M = L / (L - z)`.
    pub fn plane_wave_equivalent(&self, depth: f64, pixel_size: f64) -> Result<(f64, f64)> {
        match self.source_distance {
            None => Ok((depth, pixel_size)),
            Some(l) => {
                if l <= depth.abs() {
                    return Err(HoloError::InvalidConfiguration(format!(
                        "source distance {l} m must exceed |depth| {} m",
                        depth.abs()
                    )));
                }
                let magnification = l / (l - depth);
                Ok((depth / magnification, pixel_size / magnification))
            }
        }
    }
}

/// Phase-path options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseOptions {
    pub unwrap: bool,
    /// Subtract the phase of the background field.
    pub relative_phase: bool,
    pub remove_tilt: bool,
    pub dic: bool,
    /// Shear direction for synthetic DIC, radians from the +x axis.
    pub dic_shear_angle: f64,
    /// Zero the mean phase inside this region.
    pub reference_roi: Option<Roi>,
}

/// Everything one `process()` call needs. Treated as immutable for the
/// duration of the call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    pub optical: OpticalConfig,
    pub window: WindowSpec,
    pub off_axis: OffAxisCalibration,
    pub refocus: bool,
    pub invert: bool,
    pub output: OutputMode,
    pub phase: PhaseOptions,
    pub device: DevicePreference,
}

impl ReconstructionConfig {
    pub fn new(mode: Mode, wavelength: f64, pixel_size: f64) -> Self {
        Self {
            optical: OpticalConfig {
                mode,
                wavelength,
                pixel_size,
                ..OpticalConfig::default()
            },
            ..Self::default()
        }
    }

    /// Whether the current settings run the spectral propagator.
    pub fn propagates(&self) -> bool {
        self.refocus && self.optical.depth != 0.0
    }

    pub fn validate(&self) -> Result<()> {
        let o = &self.optical;
        if o.downsample == 0 {
            return Err(HoloError::InvalidConfiguration(
                "downsample factor must be >= 1".into(),
            ));
        }
        let needs_optics = self.refocus || o.mode == Mode::OffAxis;
        if needs_optics && !(o.wavelength > 0.0 && o.wavelength.is_finite()) {
            return Err(HoloError::InvalidConfiguration(format!(
                "wavelength must be > 0 (got {})",
                o.wavelength
            )));
        }
        if needs_optics && !(o.pixel_size > 0.0 && o.pixel_size.is_finite()) {
            return Err(HoloError::InvalidConfiguration(format!(
                "pixel size must be > 0 (got {})",
                o.pixel_size
            )));
        }
        if !o.depth.is_finite() {
            return Err(HoloError::InvalidConfiguration("depth must be finite".into()));
        }
        if let Some(l) = o.source_distance {
            if !(l > 0.0) {
                return Err(HoloError::InvalidConfiguration(
                    "source distance must be > 0".into(),
                ));
            }
        }
        if self.window.shape != WindowShape::None && self.window.thickness < 0.0 {
            return Err(HoloError::InvalidConfiguration(
                "window thickness must be >= 0".into(),
            ));
        }
        Ok(())
    }
}
