use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::accelerated::AcceleratedBackend;
use super::cpu::CpuBackend;

/// Execution backend for the spectral transform.
///
/// Implementations must agree numerically: switching backend never changes
/// the reconstructed image, only how fast it is produced.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_accelerated(&self) -> bool {
        false
    }

    /// Unnormalised forward 2D DFT.
    fn fft2d(&self, field: &Array2<Complex64>) -> Array2<Complex64>;

    /// Inverse 2D DFT, normalised by `1/(h*w)`.
    fn ifft2d(&self, spectrum: &Array2<Complex64>) -> Array2<Complex64>;

    /// Element-wise complex product.
    fn multiply(&self, a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64>;
}

/// Which backend a session should run on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePreference {
    #[default]
    Cpu,
    Accelerated,
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Accelerated => write!(f, "Accelerated"),
        }
    }
}

pub fn create_backend(preference: &DevicePreference) -> Arc<dyn ComputeBackend> {
    match preference {
        DevicePreference::Cpu => Arc::new(CpuBackend::new()),
        DevicePreference::Accelerated => Arc::new(AcceleratedBackend::new()),
    }
}
