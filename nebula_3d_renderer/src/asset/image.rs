//! Decoded image data (RGBA8 pixel buffers).

use std::path::Path;

use crate::error::{Error, Result};
use crate::nebula_debug;

/// A decoded image: tightly packed RGBA8 pixels with dimensions.
///
/// Invariant: `pixels.len() == width * height * 4`.
#[derive(Debug, Clone)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl ImageData {
    /// Decode an image file (PNG/JPEG) into RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            Error::AssetLoadFailed(format!("Failed to decode image {}: {}", path.display(), e))
        })?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        nebula_debug!(
            "nebula3d::asset",
            "Decoded image {} ({}x{})",
            path.display(),
            width,
            height
        );

        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    /// Wrap an existing RGBA8 pixel buffer.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            return Err(Error::InvalidResource(format!(
                "RGBA8 buffer size {} does not match {}x{}",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Generate a two-color checkerboard, `cell` pixels per square.
    ///
    /// Used as the demo fallback texture when no asset is supplied.
    pub fn checkerboard(size: u32, cell: u32, light: [u8; 4], dark: [u8; 4]) -> Self {
        let cell = cell.max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let color = if ((x / cell) + (y / cell)) % 2 == 0 { light } else { dark };
                pixels.extend_from_slice(&color);
            }
        }
        Self {
            width: size,
            height: size,
            pixels,
        }
    }

    /// A 1x1 solid-color image (used as the untextured-mesh fallback).
    pub fn solid(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: color.to_vec(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Total size in bytes of the pixel buffer.
    pub fn byte_size(&self) -> u64 {
        self.pixels.len() as u64
    }
}
