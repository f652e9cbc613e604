/// Minimum pixel count (h*w) to use row-level Rayon parallelism in helpers
/// that are not tied to a compute backend.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Small epsilon to avoid division by zero in normalisation.
pub const EPSILON: f32 = 1e-10;

/// Same guard for complex-field divisions.
pub const EPSILON_F64: f64 = 1e-12;

/// Fraction of the smaller spectrum dimension excluded around DC when
/// searching for the off-axis sideband.
pub const DEFAULT_DC_MARGIN_FRACTION: f64 = 0.1;

/// Crop radius as a fraction of the sideband-to-DC distance. One third keeps
/// the crop clear of the zero order, whose extent is twice the sideband's.
pub const DEFAULT_CROP_RADIUS_FRACTION: f64 = 1.0 / 3.0;

/// Peaks within this ratio of the strongest candidate count as equally strong.
pub const SIDEBAND_TIE_RATIO: f64 = 0.95;

/// A sideband must exceed the mean spectral magnitude of the search region by
/// this factor to be accepted.
pub const SIDEBAND_NOISE_FACTOR: f64 = 3.0;

/// A sideband weaker than this fraction of the DC term is treated as absent.
pub const SIDEBAND_MIN_RELATIVE: f64 = 1e-6;

/// Default number of coarse autofocus subdivisions.
pub const DEFAULT_COARSE_SEARCH_INTERVAL: usize = 10;

/// Default fine-search tolerance as a fraction of the depth range.
pub const DEFAULT_FOCUS_TOLERANCE_FRACTION: f64 = 1e-4;

/// Iteration budget for the golden-section refinement.
pub const DEFAULT_FOCUS_MAX_ITERATIONS: usize = 60;

/// Relative score difference under which two focus scores are considered tied.
pub const FOCUS_TIE_RELATIVE: f64 = 1e-9;

/// 1 / golden ratio.
pub const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// Full-scale value for 16-bit TIFF export.
pub const U16_MAX_F32: f32 = 65535.0;
