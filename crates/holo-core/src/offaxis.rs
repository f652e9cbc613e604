//! Off-axis carrier demodulation.
//!
//! A tilted reference beam shifts the object field to a sideband of the
//! hologram spectrum. Demodulation crops that sideband, moves it to zero
//! frequency and inverse-transforms it into a complex field at reduced size.

use ndarray::{s, Array2};
use num_complex::Complex64;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compute::cpu::{fftshift, ifftshift};
use crate::compute::ComputeBackend;
use crate::consts::{
    DEFAULT_CROP_RADIUS_FRACTION, DEFAULT_DC_MARGIN_FRACTION, SIDEBAND_MIN_RELATIVE,
    SIDEBAND_NOISE_FACTOR, SIDEBAND_TIE_RATIO,
};
use crate::error::{HoloError, Result};
use crate::frame::{ComplexFrame, Frame};
use crate::propagate::PixelPitch;

/// Location of the sideband in the centred spectrum, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffAxisCalibration {
    /// (x, y)
    pub crop_centre: (usize, usize),
    /// (rx, ry)
    pub crop_radius: (usize, usize),
}

impl Default for OffAxisCalibration {
    fn default() -> Self {
        Self {
            crop_centre: (20, 20),
            crop_radius: (10, 10),
        }
    }
}

impl OffAxisCalibration {
    /// Size of the demodulated field, (height, width).
    pub fn output_dim(&self) -> (usize, usize) {
        (2 * self.crop_radius.1, 2 * self.crop_radius.0)
    }

    /// Check the crop window fits a `dim` = (height, width) spectrum.
    pub fn validated(&self, dim: (usize, usize)) -> Result<()> {
        let (h, w) = dim;
        let (cx, cy) = self.crop_centre;
        let (rx, ry) = self.crop_radius;
        if rx == 0 || ry == 0 {
            return Err(HoloError::InvalidConfiguration(
                "off-axis crop radius must be > 0".into(),
            ));
        }
        if cx < rx || cy < ry || cx + rx > w || cy + ry > h {
            return Err(HoloError::InvalidConfiguration(format!(
                "off-axis crop at ({cx},{cy}) radius ({rx},{ry}) exceeds {w}x{h} spectrum"
            )));
        }
        Ok(())
    }

    /// Pixel pitch of the demodulated field given the hologram pitch.
    pub fn demodulated_pitch(&self, dim: (usize, usize), pitch: PixelPitch) -> PixelPitch {
        let (oh, ow) = self.output_dim();
        PixelPitch {
            x: pitch.x * dim.1 as f64 / ow as f64,
            y: pitch.y * dim.0 as f64 / oh as f64,
        }
    }
}

/// Centred magnitude spectrum of a real frame.
pub fn magnitude_spectrum(frame: &Frame, backend: &dyn ComputeBackend) -> Array2<f64> {
    let spectrum = backend.fft2d(&frame.to_field().data);
    fftshift(&spectrum).mapv(|v| v.norm())
}

/// Locate the sideband in `frame` and choose a crop around it.
///
/// The search ignores a disc around DC. Among local maxima within
/// `SIDEBAND_TIE_RATIO` of the strongest, the one farthest from DC wins;
/// remaining ties go to the first in raster order.
pub fn calibrate(frame: &Frame, backend: &dyn ComputeBackend) -> Result<OffAxisCalibration> {
    frame.validate()?;
    let (h, w) = frame.dim();
    if h < 4 || w < 4 {
        return Err(HoloError::CalibrationFailure(format!(
            "{w}x{h} frame too small for sideband detection"
        )));
    }

    let mag = magnitude_spectrum(frame, backend);
    let cy = (h / 2) as f64;
    let cx = (w / 2) as f64;
    let margin = (DEFAULT_DC_MARGIN_FRACTION * h.min(w) as f64).max(1.0);
    let dist = |r: usize, c: usize| ((r as f64 - cy).powi(2) + (c as f64 - cx).powi(2)).sqrt();

    let mut sum = 0.0f64;
    let mut count = 0usize;
    let mut peaks: Vec<(usize, usize, f64)> = Vec::new();
    for r in 0..h {
        for c in 0..w {
            if dist(r, c) <= margin {
                continue;
            }
            let v = mag[[r, c]];
            sum += v;
            count += 1;
            if is_local_max(&mag, r, c) {
                peaks.push((r, c, v));
            }
        }
    }

    let strongest = peaks.iter().map(|p| p.2).fold(0.0f64, f64::max);
    let mean = if count > 0 { sum / count as f64 } else { 0.0 };
    let dc = mag[[h / 2, w / 2]];
    debug!(strongest, mean, dc, candidates = peaks.len(), "Sideband search");
    if strongest <= SIDEBAND_MIN_RELATIVE * dc || strongest <= SIDEBAND_NOISE_FACTOR * mean {
        return Err(HoloError::CalibrationFailure(
            "no sideband above the spectral noise floor".into(),
        ));
    }

    let mut best: Option<(usize, usize, f64)> = None;
    for &(r, c, v) in &peaks {
        if v < SIDEBAND_TIE_RATIO * strongest {
            continue;
        }
        let d = dist(r, c);
        if best.map_or(true, |(_, _, bd)| d > bd) {
            best = Some((r, c, d));
        }
    }
    let (pr, pc, d) = best.ok_or_else(|| {
        HoloError::CalibrationFailure("no sideband candidate survived selection".into())
    })?;

    let wanted = (d * DEFAULT_CROP_RADIUS_FRACTION).round() as usize;
    let fit = pc.min(w - pc).min(pr).min(h - pr);
    let radius = wanted.min(fit);
    if radius == 0 {
        return Err(HoloError::CalibrationFailure(format!(
            "sideband at ({pc},{pr}) too close to DC or the spectrum edge"
        )));
    }

    let calib = OffAxisCalibration {
        crop_centre: (pc, pr),
        crop_radius: (radius, radius),
    };
    info!(
        centre_x = pc,
        centre_y = pr,
        radius,
        "Off-axis sideband located"
    );
    Ok(calib)
}

fn is_local_max(mag: &Array2<f64>, r: usize, c: usize) -> bool {
    let (h, w) = mag.dim();
    let v = mag[[r, c]];
    for rr in r.saturating_sub(1)..=(r + 1).min(h - 1) {
        for cc in c.saturating_sub(1)..=(c + 1).min(w - 1) {
            if (rr, cc) != (r, c) && mag[[rr, cc]] > v {
                return false;
            }
        }
    }
    true
}

/// Crop the sideband, recentre it at zero frequency and return the baseband
/// field. Bins outside the inscribed ellipse of the crop are dropped.
pub fn demodulate(frame: &Frame, calib: &OffAxisCalibration, backend: &dyn ComputeBackend) -> Result<ComplexFrame> {
    frame.validate()?;
    let (h, w) = frame.dim();
    calib.validated((h, w))?;

    let spectrum = fftshift(&backend.fft2d(&frame.to_field().data));
    let (cx, cy) = calib.crop_centre;
    let (rx, ry) = calib.crop_radius;
    let mut crop = spectrum
        .slice(s![cy - ry..cy + ry, cx - rx..cx + rx])
        .to_owned();

    let (rxf, ryf) = (rx as f64, ry as f64);
    for ((r, c), v) in crop.indexed_iter_mut() {
        let u = (c as f64 - rxf) / rxf;
        let t = (r as f64 - ryf) / ryf;
        if u * u + t * t > 1.0 {
            *v = Complex64::zero();
        }
    }

    let baseband = backend.ifft2d(&ifftshift(&crop));
    // Keep amplitudes on the scale of a full-size reconstruction.
    let scale = (4 * rx * ry) as f64 / (h * w) as f64;
    Ok(ComplexFrame::new(baseband.mapv(|v| v * scale)))
}
