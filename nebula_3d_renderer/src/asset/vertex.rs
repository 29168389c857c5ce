//! Vertex layout shared between the asset bridge and the GPU backend.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// A single mesh vertex: position, texture coordinate, normal.
///
/// `#[repr(C)]` and `Pod` so vertex arrays can be uploaded byte-for-byte.
/// The GPU vertex input layout (binding stride, attribute offsets) is
/// derived from this struct in the Vulkan backend.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: Vec3,
    /// Texture coordinate (V already flipped for Vulkan's top-left origin)
    pub uv: Vec2,
    /// Smooth normal
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, uv: Vec2, normal: Vec3) -> Self {
        Self { position, uv, normal }
    }

    /// Size of one vertex in bytes (the vertex buffer binding stride).
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;

    /// Byte offset of the `uv` attribute.
    pub const UV_OFFSET: u32 = std::mem::size_of::<Vec3>() as u32;

    /// Byte offset of the `normal` attribute.
    pub const NORMAL_OFFSET: u32 = Self::UV_OFFSET + std::mem::size_of::<Vec2>() as u32;
}
