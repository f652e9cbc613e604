use std::path::Path;

use image::{GrayImage, ImageBuffer, ImageFormat, Luma};
use ndarray::Array2;

use crate::consts::U16_MAX_F32;
use crate::error::{HoloError, Result};
use crate::frame::Frame;

/// Scale a [0, 1] frame to 16-bit samples in row-major order.
pub fn to_u16_pixels(frame: &Frame) -> Vec<u16> {
    frame
        .data
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * U16_MAX_F32).round() as u16)
        .collect()
}

/// Save a frame as 16-bit grayscale TIFF. Values are clamped to [0, 1].
pub fn save_tiff(frame: &Frame, path: &Path) -> Result<()> {
    let (h, w) = frame.dim();
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, to_u16_pixels(frame))
        .ok_or(HoloError::EmptyInput)?;
    img.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save a frame as 8-bit grayscale PNG. Values are clamped to [0, 1].
pub fn save_png(frame: &Frame, path: &Path) -> Result<()> {
    let (h, w) = frame.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for ((row, col), &v) in frame.data.indexed_iter() {
        img.put_pixel(col as u32, row as u32, Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8]));
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save frame, choosing format from file extension.
pub fn save_image(frame: &Frame, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => save_png(frame, path),
        _ => save_tiff(frame, path),
    }
}

/// Load an image file as a grayscale intensity frame scaled to [0, 1].
pub fn load_image(path: &Path) -> Result<Frame> {
    let gray = image::open(path)?.to_luma16();
    let (w, h) = gray.dimensions();
    let data = Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0] as f32 / U16_MAX_F32
    });
    Ok(Frame::new(data))
}
