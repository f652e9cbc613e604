mod common;

use holo_core::frame::Frame;
use holo_core::io::{load_image, save_png, save_tiff, write_frame_stack, write_intensity_stack};
use holo_core::config::Mode;
use holo_core::Holo;
use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};

use common::test_pattern;

fn count_pages(path: &std::path::Path) -> (usize, Vec<u16>) {
    let file = std::fs::File::open(path).unwrap();
    let mut decoder = Decoder::new(file).unwrap();
    let mut pages = 0;
    let mut first = Vec::new();
    loop {
        let image = decoder.read_image().unwrap();
        if pages == 0 {
            if let DecodingResult::U16(data) = image {
                first = data;
            }
        }
        pages += 1;
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().unwrap();
    }
    (pages, first)
}

#[test]
fn test_tiff_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.tiff");
    let frame = Frame::new(Array2::from_shape_fn((8, 12), |(r, c)| (r * 12 + c) as f32 / 95.0));

    save_tiff(&frame, &path).unwrap();
    let loaded = load_image(&path).unwrap();
    assert_eq!(loaded.dim(), (8, 12));
    for (a, b) in loaded.data.iter().zip(frame.data.iter()) {
        assert!((a - b).abs() < 1e-4);
    }
}

#[test]
fn test_png_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    let frame = test_pattern(16, 16);
    save_png(&frame, &path).unwrap();
    let loaded = load_image(&path).unwrap();
    for (a, b) in loaded.data.iter().zip(frame.data.iter()) {
        assert!((a - b).abs() < 1.0 / 255.0);
    }
}

#[test]
fn test_intensity_stack_pages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.tiff");

    let mut holo = Holo::new(Mode::Inline, 0.5e-6, 2.0e-6);
    holo.set_refocus(true);
    let stack = holo.depth_stack(&test_pattern(24, 20), (0.0, 4e-5), 4).unwrap();
    write_intensity_stack(&stack, &path).unwrap();

    let (pages, first) = count_pages(&path);
    assert_eq!(pages, 4);
    assert_eq!(first.len(), 24 * 20);
}

#[test]
fn test_intensity_stack_uses_stack_wide_peak() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stack.tiff");

    let mut holo = Holo::new(Mode::Inline, 0.5e-6, 2.0e-6);
    holo.set_refocus(true);
    let stack = holo.depth_stack(&test_pattern(24, 20), (0.0, 6e-5), 3).unwrap();
    write_intensity_stack(&stack, &path).unwrap();

    let mut decoder = Decoder::new(std::fs::File::open(&path).unwrap()).unwrap();
    let mut page_peaks = Vec::new();
    loop {
        if let DecodingResult::U16(data) = decoder.read_image().unwrap() {
            page_peaks.push(data.into_iter().max().unwrap_or(0));
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().unwrap();
    }
    assert_eq!(page_peaks.iter().copied().max(), Some(u16::MAX));
}

#[test]
fn test_frame_stack_rejects_mixed_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.tiff");
    let frames = vec![test_pattern(8, 8), test_pattern(8, 9)];
    assert!(write_frame_stack(&frames, &path).is_err());
    assert!(write_frame_stack(&[], &path).is_err());
}
