//! Asset bridge module
//!
//! Decodes mesh and image files into backend-agnostic CPU-side data
//! (vertex/index arrays, RGBA8 pixel buffers) ready for GPU upload.
//! No graphics API types appear here.

pub mod image;
pub mod mesh;
pub mod model;
pub mod vertex;

#[cfg(test)]
mod image_tests;
#[cfg(test)]
mod mesh_tests;
#[cfg(test)]
mod model_tests;

pub use image::ImageData;
pub use mesh::Mesh;
pub use model::Model;
pub use vertex::Vertex;
