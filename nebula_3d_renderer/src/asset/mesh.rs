//! Mesh data: vertex/index arrays plus an optional texture.

use std::path::Path;

use glam::{Vec2, Vec3};

use crate::error::{Error, Result};
use crate::nebula_info;

use super::image::ImageData;
use super::vertex::Vertex;

/// A single drawable mesh: triangle-list geometry with u32 indices and
/// zero-or-one associated texture.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    texture: Option<ImageData>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, texture: Option<ImageData>) -> Self {
        Self {
            vertices,
            indices,
            texture,
        }
    }

    /// Load the first shape of an OBJ file as a single mesh.
    ///
    /// Vertices are emitted per face index (no deduplication) and indices
    /// appended sequentially, so every triangle owns its three vertices.
    /// The V coordinate is flipped for Vulkan's top-left texture origin.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|e| {
            Error::AssetLoadFailed(format!("Failed to load mesh {}: {}", path.display(), e))
        })?;

        let model = models.first().ok_or_else(|| {
            Error::AssetLoadFailed(format!("No shapes in OBJ file {}", path.display()))
        })?;

        let mesh = mesh_from_obj(&model.mesh);
        nebula_info!(
            "nebula3d::asset",
            "Loaded mesh {} ({} vertices, {} indices)",
            path.display(),
            mesh.vertex_count(),
            mesh.index_count()
        );
        Ok(mesh)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn texture(&self) -> Option<&ImageData> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: ImageData) {
        self.texture = Some(texture);
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// An axis-aligned unit cube centered at the origin: 24 vertices,
    /// 36 indices (12 triangles), per-face normals and UVs.
    ///
    /// Used as the demo fallback model and in scheduler tests.
    pub fn unit_cube() -> Self {
        // (normal, four corners in CCW winding seen from outside)
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            (
                Vec3::Z,
                [
                    Vec3::new(-0.5, -0.5, 0.5),
                    Vec3::new(0.5, -0.5, 0.5),
                    Vec3::new(0.5, 0.5, 0.5),
                    Vec3::new(-0.5, 0.5, 0.5),
                ],
            ),
            (
                Vec3::NEG_Z,
                [
                    Vec3::new(0.5, -0.5, -0.5),
                    Vec3::new(-0.5, -0.5, -0.5),
                    Vec3::new(-0.5, 0.5, -0.5),
                    Vec3::new(0.5, 0.5, -0.5),
                ],
            ),
            (
                Vec3::X,
                [
                    Vec3::new(0.5, -0.5, 0.5),
                    Vec3::new(0.5, -0.5, -0.5),
                    Vec3::new(0.5, 0.5, -0.5),
                    Vec3::new(0.5, 0.5, 0.5),
                ],
            ),
            (
                Vec3::NEG_X,
                [
                    Vec3::new(-0.5, -0.5, -0.5),
                    Vec3::new(-0.5, -0.5, 0.5),
                    Vec3::new(-0.5, 0.5, 0.5),
                    Vec3::new(-0.5, 0.5, -0.5),
                ],
            ),
            (
                Vec3::Y,
                [
                    Vec3::new(-0.5, 0.5, 0.5),
                    Vec3::new(0.5, 0.5, 0.5),
                    Vec3::new(0.5, 0.5, -0.5),
                    Vec3::new(-0.5, 0.5, -0.5),
                ],
            ),
            (
                Vec3::NEG_Y,
                [
                    Vec3::new(-0.5, -0.5, -0.5),
                    Vec3::new(0.5, -0.5, -0.5),
                    Vec3::new(0.5, -0.5, 0.5),
                    Vec3::new(-0.5, -0.5, 0.5),
                ],
            ),
        ];

        let uvs = [
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            for (corner, uv) in corners.into_iter().zip(uvs) {
                vertices.push(Vertex::new(corner, uv, normal));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self {
            vertices,
            indices,
            texture: None,
        }
    }
}

/// Convert a tobj mesh into engine vertices/indices.
///
/// tobj with `GPU_LOAD_OPTIONS` already triangulates and produces a single
/// index stream; missing texcoords/normals fall back to zero.
pub(crate) fn mesh_from_obj(mesh: &tobj::Mesh) -> Mesh {
    let vertex_count = mesh.positions.len() / 3;
    let mut vertices = Vec::with_capacity(vertex_count);
    for i in 0..vertex_count {
        let position = Vec3::new(
            mesh.positions[3 * i],
            mesh.positions[3 * i + 1],
            mesh.positions[3 * i + 2],
        );
        let uv = if mesh.texcoords.len() >= 2 * (i + 1) {
            // Flip V for Vulkan's top-left texture origin
            Vec2::new(mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1])
        } else {
            Vec2::ZERO
        };
        let normal = if mesh.normals.len() >= 3 * (i + 1) {
            Vec3::new(mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2])
        } else {
            Vec3::ZERO
        };
        vertices.push(Vertex::new(position, uv, normal));
    }

    Mesh::new(vertices, mesh.indices.clone(), None)
}
