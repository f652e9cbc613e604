pub mod compute;
pub mod config;
pub mod consts;
pub mod correct;
pub mod display;
pub mod error;
pub mod focus;
pub mod frame;
pub mod io;
pub mod offaxis;
pub mod phase;
pub mod propagate;
pub mod reconstruct;
pub mod session;
pub mod stack;
pub mod window;

pub use config::{Mode, OutputMode, ReconstructionConfig};
pub use error::{HoloError, Result};
pub use frame::{ComplexFrame, Frame, Roi};
pub use reconstruct::{ProcessStatus, ProcessedFrame, Reconstructor, ReferenceFrames};
pub use session::Holo;
