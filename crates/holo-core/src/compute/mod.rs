mod backend;
pub mod accelerated;
pub mod cpu;

pub use backend::{create_backend, ComputeBackend, DevicePreference};
