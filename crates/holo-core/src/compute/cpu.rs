use std::sync::{Arc, Mutex};

use ndarray::{Array2, Zip};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use super::ComputeBackend;

/// Single-threaded CPU backend.
pub struct CpuBackend {
    planner: Mutex<FftPlanner<f64>>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    pub(crate) fn plans(&self, h: usize, w: usize, inverse: bool) -> (Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>) {
        plan_pair(&self.planner, h, w, inverse)
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "CPU"
    }

    fn fft2d(&self, field: &Array2<Complex64>) -> Array2<Complex64> {
        let (h, w) = field.dim();
        let (fft_row, fft_col) = self.plans(h, w, false);
        let mut work = field.clone();
        transform_sequential(&mut work, &fft_row, &fft_col);
        work
    }

    fn ifft2d(&self, spectrum: &Array2<Complex64>) -> Array2<Complex64> {
        let (h, w) = spectrum.dim();
        let (ifft_row, ifft_col) = self.plans(h, w, true);
        let mut work = spectrum.clone();
        transform_sequential(&mut work, &ifft_row, &ifft_col);
        let scale = 1.0 / (h * w) as f64;
        work.mapv_inplace(|v| v * scale);
        work
    }

    fn multiply(&self, a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
        Zip::from(a).and(b).map_collect(|&x, &y| x * y)
    }
}

/// Row and column plans from a shared planner. The planner caches plans, so
/// repeated frames of the same size reuse them.
pub(crate) fn plan_pair(
    planner: &Mutex<FftPlanner<f64>>,
    h: usize,
    w: usize,
    inverse: bool,
) -> (Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>) {
    // A poisoned planner still holds valid plans.
    let mut planner = planner.lock().unwrap_or_else(|e| e.into_inner());
    if inverse {
        (planner.plan_fft_inverse(w), planner.plan_fft_inverse(h))
    } else {
        (planner.plan_fft_forward(w), planner.plan_fft_forward(h))
    }
}

fn transform_sequential(
    work: &mut Array2<Complex64>,
    fft_row: &Arc<dyn Fft<f64>>,
    fft_col: &Arc<dyn Fft<f64>>,
) {
    let (h, w) = work.dim();
    let mut row_data = vec![Complex64::new(0.0, 0.0); w];
    for row in 0..h {
        for col in 0..w {
            row_data[col] = work[[row, col]];
        }
        fft_row.process(&mut row_data);
        for col in 0..w {
            work[[row, col]] = row_data[col];
        }
    }
    let mut col_data = vec![Complex64::new(0.0, 0.0); h];
    for col in 0..w {
        for row in 0..h {
            col_data[row] = work[[row, col]];
        }
        fft_col.process(&mut col_data);
        for row in 0..h {
            work[[row, col]] = col_data[row];
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum layout helpers
// ---------------------------------------------------------------------------

/// Move the zero-frequency bin to `(h/2, w/2)`.
pub fn fftshift<T: Clone>(data: &Array2<T>) -> Array2<T> {
    let (h, w) = data.dim();
    roll(data, h / 2, w / 2)
}

/// Inverse of [`fftshift`], also correct for odd sizes.
pub fn ifftshift<T: Clone>(data: &Array2<T>) -> Array2<T> {
    let (h, w) = data.dim();
    roll(data, h - h / 2, w - w / 2)
}

fn roll<T: Clone>(data: &Array2<T>, dr: usize, dc: usize) -> Array2<T> {
    let (h, w) = data.dim();
    Array2::from_shape_fn((h, w), |(r, c)| {
        data[[(r + h - dr % h.max(1)) % h, (c + w - dc % w.max(1)) % w]].clone()
    })
}

/// Signed frequency index of DFT bin `k` in an `n`-point transform.
pub fn signed_bin(k: usize, n: usize) -> f64 {
    if k <= n / 2 {
        k as f64
    } else {
        k as f64 - n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_roundtrip_odd_size() {
        let data = Array2::from_shape_fn((5, 7), |(r, c)| (r * 7 + c) as f64);
        let back = ifftshift(&fftshift(&data));
        assert_eq!(back, data);
    }

    #[test]
    fn fftshift_moves_dc_to_centre() {
        let mut data = Array2::<f64>::zeros((4, 6));
        data[[0, 0]] = 1.0;
        let shifted = fftshift(&data);
        assert_eq!(shifted[[2, 3]], 1.0);
    }
}
