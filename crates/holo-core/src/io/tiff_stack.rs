//! Multi-page 16-bit TIFF export for depth stacks.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};
use tracing::info;

use super::image_io::to_u16_pixels;
use crate::error::{HoloError, Result};
use crate::frame::Frame;
use crate::stack::DepthStack;

/// Write |field|^2 at every depth as one page each, scaled so the brightest
/// sample in the whole stack maps to full scale. Pages keep their relative
/// brightness.
pub fn write_intensity_stack(stack: &DepthStack, path: &Path) -> Result<()> {
    if stack.is_empty() {
        return Err(HoloError::EmptyInput);
    }
    let intensities: Vec<Frame> = stack.entries.iter().map(|e| e.field.intensity()).collect();
    let peak = intensities
        .iter()
        .map(Frame::max)
        .fold(0.0f32, f32::max);
    let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };
    let pages: Vec<Frame> = intensities
        .into_iter()
        .map(|f| Frame::new(f.data.mapv(|v| v * scale)))
        .collect();
    write_frame_stack(&pages, path)
}

/// Write frames already scaled to [0, 1] as a multi-page TIFF. All pages must
/// share one size.
pub fn write_frame_stack(frames: &[Frame], path: &Path) -> Result<()> {
    let first = frames.first().ok_or(HoloError::EmptyInput)?;
    let (h, w) = first.dim();
    for frame in frames {
        crate::frame::check_same_dim("stack page", (h, w), frame.dim())?;
    }

    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    for frame in frames {
        encoder.write_image::<colortype::Gray16>(w as u32, h as u32, &to_u16_pixels(frame))?;
    }
    info!(pages = frames.len(), width = w, height = h, path = %path.display(), "Wrote TIFF stack");
    Ok(())
}
