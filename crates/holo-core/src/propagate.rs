//! Angular-spectrum propagation.
//!
//! A field is refocused by multiplying its 2D spectrum with
//! `H(fx, fy) = exp(i 2 pi z sqrt(1/lambda^2 - fx^2 - fy^2))` and transforming
//! back. Components with a negative radicand are evanescent and are zeroed.

use std::f64::consts::TAU;
use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;
use tracing::debug;

use crate::compute::cpu::signed_bin;
use crate::compute::ComputeBackend;
use crate::error::{HoloError, Result};
use crate::frame::ComplexFrame;

/// Sample spacing of a field in meters. Off-axis demodulation can make the two
/// axes differ.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelPitch {
    pub x: f64,
    pub y: f64,
}

impl PixelPitch {
    pub fn square(p: f64) -> Self {
        Self { x: p, y: p }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    fn is_valid(&self) -> bool {
        self.x > 0.0 && self.y > 0.0 && self.x.is_finite() && self.y.is_finite()
    }
}

/// Axial wavenumber `2 pi sqrt(1/lambda^2 - fx^2 - fy^2)` per DFT bin, or
/// `None` for evanescent bins.
pub fn axial_wavenumbers(dim: (usize, usize), wavelength: f64, pitch: PixelPitch) -> Array2<Option<f64>> {
    let (h, w) = dim;
    let inv_l2 = 1.0 / (wavelength * wavelength);
    let dfx = 1.0 / (w as f64 * pitch.x);
    let dfy = 1.0 / (h as f64 * pitch.y);
    Array2::from_shape_fn((h, w), |(r, c)| {
        let fy = signed_bin(r, h) * dfy;
        let fx = signed_bin(c, w) * dfx;
        let radicand = inv_l2 - fx * fx - fy * fy;
        if radicand < 0.0 {
            None
        } else {
            Some(TAU * radicand.sqrt())
        }
    })
}

/// Transfer function for one propagation distance, in unshifted DFT layout.
pub fn transfer_function(dim: (usize, usize), wavelength: f64, pitch: PixelPitch, depth: f64) -> Array2<Complex64> {
    transfer_from_wavenumbers(&axial_wavenumbers(dim, wavelength, pitch), depth)
}

fn transfer_from_wavenumbers(kz: &Array2<Option<f64>>, depth: f64) -> Array2<Complex64> {
    kz.mapv(|k| match k {
        Some(k) => Complex64::from_polar(1.0, k * depth),
        None => Complex64::new(0.0, 0.0),
    })
}

#[derive(Clone, Copy, PartialEq)]
struct GridKey {
    dim: (usize, usize),
    wavelength: f64,
    pitch: PixelPitch,
}

/// A field together with its forward spectrum, so that many depths can be
/// tried for the price of one forward transform.
#[derive(Clone, Debug)]
pub struct PreparedField {
    pub field: ComplexFrame,
    pub spectrum: Array2<Complex64>,
}

/// Propagator with a transfer-function cache.
///
/// The wavenumber grid depends on (size, wavelength, pitch) and is rebuilt
/// only when one of those changes; the transfer function additionally
/// depends on depth. Sweeping depth therefore reuses the grid.
pub struct Propagator {
    backend: Arc<dyn ComputeBackend>,
    grid: Option<(GridKey, Array2<Option<f64>>)>,
    transfer: Option<(GridKey, f64, Array2<Complex64>)>,
}

impl Propagator {
    pub fn new(backend: Arc<dyn ComputeBackend>) -> Self {
        Self {
            backend,
            grid: None,
            transfer: None,
        }
    }

    pub fn backend(&self) -> &Arc<dyn ComputeBackend> {
        &self.backend
    }

    /// Swap the execution backend. Cached transfer functions stay valid.
    pub fn set_backend(&mut self, backend: Arc<dyn ComputeBackend>) {
        self.backend = backend;
    }

    /// Propagate `field` by `depth` meters.
    pub fn propagate(
        &mut self,
        field: &ComplexFrame,
        depth: f64,
        wavelength: f64,
        pitch: PixelPitch,
    ) -> Result<ComplexFrame> {
        field.validate()?;
        check_optics(wavelength, pitch)?;
        if depth == 0.0 {
            return Ok(field.clone());
        }
        let spectrum = self.backend.fft2d(&field.data);
        self.apply(&spectrum, field.dim(), depth, wavelength, pitch)
    }

    pub fn prepare(&self, field: &ComplexFrame) -> Result<PreparedField> {
        field.validate()?;
        Ok(PreparedField {
            field: field.clone(),
            spectrum: self.backend.fft2d(&field.data),
        })
    }

    /// Propagate a prepared field; depth zero returns the original samples.
    pub fn propagate_prepared(
        &mut self,
        prepared: &PreparedField,
        depth: f64,
        wavelength: f64,
        pitch: PixelPitch,
    ) -> Result<ComplexFrame> {
        check_optics(wavelength, pitch)?;
        if depth == 0.0 {
            return Ok(prepared.field.clone());
        }
        self.apply(&prepared.spectrum, prepared.field.dim(), depth, wavelength, pitch)
    }

    fn apply(
        &mut self,
        spectrum: &Array2<Complex64>,
        dim: (usize, usize),
        depth: f64,
        wavelength: f64,
        pitch: PixelPitch,
    ) -> Result<ComplexFrame> {
        if !depth.is_finite() {
            return Err(HoloError::InvalidConfiguration("depth must be finite".into()));
        }
        let key = GridKey {
            dim,
            wavelength,
            pitch,
        };
        let backend = Arc::clone(&self.backend);
        let transfer = self.transfer_for(key, depth);
        let filtered = backend.multiply(spectrum, transfer);
        Ok(ComplexFrame::new(backend.ifft2d(&filtered)))
    }

    fn transfer_for(&mut self, key: GridKey, depth: f64) -> &Array2<Complex64> {
        let fresh = matches!(&self.transfer, Some((k, d, _)) if *k == key && *d == depth);
        if !fresh {
            if !matches!(&self.grid, Some((k, _)) if *k == key) {
                debug!(
                    height = key.dim.0,
                    width = key.dim.1,
                    wavelength = key.wavelength,
                    "Rebuilding angular-spectrum wavenumber grid"
                );
                self.grid = None;
            }
            let (_, kz) = self
                .grid
                .get_or_insert_with(|| (key, axial_wavenumbers(key.dim, key.wavelength, key.pitch)));
            let transfer = transfer_from_wavenumbers(kz, depth);
            self.transfer = Some((key, depth, transfer));
        }
        let (_, _, transfer) = self
            .transfer
            .get_or_insert_with(|| (key, depth, transfer_function(key.dim, key.wavelength, key.pitch, depth)));
        transfer
    }
}

fn check_optics(wavelength: f64, pitch: PixelPitch) -> Result<()> {
    if !(wavelength > 0.0 && wavelength.is_finite()) {
        return Err(HoloError::InvalidConfiguration(format!(
            "wavelength must be > 0 (got {wavelength})"
        )));
    }
    if !pitch.is_valid() {
        return Err(HoloError::InvalidConfiguration(format!(
            "pixel size must be > 0 (got {} x {})",
            pitch.x, pitch.y
        )));
    }
    Ok(())
}
