//! Unit tests for asset/image.rs

use crate::asset::image::ImageData;
use crate::error::Error;

#[test]
fn test_from_rgba8_accepts_matching_buffer() {
    let img = ImageData::from_rgba8(2, 2, vec![0u8; 16]).unwrap();
    assert_eq!(img.width(), 2);
    assert_eq!(img.height(), 2);
    assert_eq!(img.byte_size(), 16);
}

#[test]
fn test_from_rgba8_rejects_short_buffer() {
    let err = ImageData::from_rgba8(4, 4, vec![0u8; 10]).unwrap_err();
    assert!(matches!(err, Error::InvalidResource(_)));
}

#[test]
fn test_solid_is_one_pixel() {
    let img = ImageData::solid([255, 0, 0, 255]);
    assert_eq!(img.width(), 1);
    assert_eq!(img.height(), 1);
    assert_eq!(img.pixels(), &[255, 0, 0, 255]);
}

#[test]
fn test_checkerboard_dimensions_and_pattern() {
    let light = [255, 255, 255, 255];
    let dark = [30, 30, 30, 255];
    let img = ImageData::checkerboard(8, 4, light, dark);

    assert_eq!(img.width(), 8);
    assert_eq!(img.height(), 8);
    assert_eq!(img.byte_size(), 8 * 8 * 4);

    let pixel = |x: u32, y: u32| {
        let i = ((y * 8 + x) * 4) as usize;
        &img.pixels()[i..i + 4]
    };

    // Top-left cell is light, the next cell over is dark.
    assert_eq!(pixel(0, 0), &light);
    assert_eq!(pixel(3, 3), &light);
    assert_eq!(pixel(4, 0), &dark);
    assert_eq!(pixel(0, 4), &dark);
    // Diagonal neighbor cell flips back to light.
    assert_eq!(pixel(4, 4), &light);
}

#[test]
fn test_load_missing_file_is_asset_error() {
    let err = ImageData::load("definitely/not/here.png").unwrap_err();
    assert!(matches!(err, Error::AssetLoadFailed(_)));
}
