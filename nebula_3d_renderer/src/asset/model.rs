//! Model loading: a flat list of meshes with per-material textures.

use std::path::Path;

use crate::error::{Error, Result};
use crate::{nebula_info, nebula_warn};

use super::image::ImageData;
use super::mesh::{mesh_from_obj, Mesh};

/// A loaded model: every shape of the source asset flattened into a flat
/// mesh list, each mesh carrying its material's diffuse texture when one
/// exists. The source hierarchy is irrelevant for rendering, so it is not
/// preserved.
#[derive(Debug, Clone)]
pub struct Model {
    meshes: Vec<Mesh>,
}

impl Model {
    /// Wrap already-decoded meshes.
    pub fn from_meshes(meshes: Vec<Mesh>) -> Self {
        Self { meshes }
    }

    /// Load all shapes of an OBJ file, resolving diffuse textures from the
    /// MTL library relative to the model's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|e| {
            Error::AssetLoadFailed(format!("Failed to load model {}: {}", path.display(), e))
        })?;

        if models.is_empty() {
            return Err(Error::AssetLoadFailed(format!(
                "No shapes in OBJ file {}",
                path.display()
            )));
        }

        let materials = materials.unwrap_or_default();
        let directory = path.parent().unwrap_or_else(|| Path::new("."));

        let mut meshes = Vec::with_capacity(models.len());
        for model in &models {
            let mut mesh = mesh_from_obj(&model.mesh);

            if let Some(material_id) = model.mesh.material_id {
                if let Some(texture_name) =
                    materials.get(material_id).and_then(|m| m.diffuse_texture.as_ref())
                {
                    let texture_path = directory.join(texture_name);
                    match ImageData::load(&texture_path) {
                        Ok(texture) => mesh.set_texture(texture),
                        Err(e) => {
                            // Missing texture degrades to the untextured
                            // fallback rather than failing the whole model.
                            nebula_warn!(
                                "nebula3d::asset",
                                "Shape '{}' texture unavailable: {}",
                                model.name,
                                e
                            );
                        }
                    }
                }
            }

            meshes.push(mesh);
        }

        nebula_info!(
            "nebula3d::asset",
            "Loaded model {} ({} meshes, {} textured)",
            path.display(),
            meshes.len(),
            meshes.iter().filter(|m| m.texture().is_some()).count()
        );

        Ok(Self { meshes })
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
