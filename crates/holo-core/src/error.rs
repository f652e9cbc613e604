use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoloError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Empty input frame")]
    EmptyInput,

    #[error("Input frame contains non-finite values")]
    NonFiniteInput,

    #[error("{what} size mismatch: expected {}x{}, found {}x{}", expected.1, expected.0, found.1, found.0)]
    DimensionMismatch {
        what: &'static str,
        /// (height, width)
        expected: (usize, usize),
        /// (height, width)
        found: (usize, usize),
    },

    #[error("Off-axis calibration failed: {0}")]
    CalibrationFailure(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("TIFF encoding error: {0}")]
    Tiff(#[from] tiff::TiffError),
}

impl HoloError {
    /// Errors a live display loop should absorb by showing the raw frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_)
                | Self::EmptyInput
                | Self::NonFiniteInput
                | Self::DimensionMismatch { .. }
                | Self::CalibrationFailure(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HoloError>;
