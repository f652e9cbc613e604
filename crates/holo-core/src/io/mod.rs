pub mod image_io;
pub mod tiff_stack;

pub use image_io::{load_image, save_image, save_png, save_tiff};
pub use tiff_stack::{write_frame_stack, write_intensity_stack};
