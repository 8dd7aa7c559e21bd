//! Wavefront OBJ import.
//!
//! Every object of the file becomes one [`GraphicsEntity`]. Faces are
//! triangulated and vertices are re-indexed so positions, normals and UVs
//! share one index buffer.

use std::{
    io::{BufReader, Cursor},
    path::Path,
};

use anyhow::Context as _;

use crate::{
    data_structures::{graphics_entity::GraphicsEntity, texture::Texture},
    error::RendererError,
    resources::{load_string, load_texture},
};

pub fn load_obj(path: impl AsRef<Path>) -> anyhow::Result<Vec<GraphicsEntity>> {
    let path = path.as_ref();
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let obj_text = load_string(path)?;
    let mut reader = BufReader::new(Cursor::new(obj_text));

    let (models, materials) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| tobj::load_mtl(base.join(p)),
    )
    .with_context(|| format!("parsing {}", path.display()))?;

    let materials = materials.unwrap_or_else(|e| {
        log::warn!("{}: materials could not be loaded: {}", path.display(), e);
        Vec::new()
    });

    let entities: Vec<_> = models
        .into_iter()
        .filter_map(|model| {
            let material = model.mesh.material_id.and_then(|id| materials.get(id));
            let entity = to_entity(model, material, base);
            match entity.validate() {
                Ok(()) => Some(entity),
                Err(e) => {
                    log::warn!("skipping object {} of {}: {}", entity.name, path.display(), e);
                    None
                }
            }
        })
        .collect();

    log::info!("loaded {} objects from {}", entities.len(), path.display());
    Ok(entities)
}

fn to_entity(model: tobj::Model, material: Option<&tobj::Material>, base: &Path) -> GraphicsEntity {
    let mesh = model.mesh;
    let vertex_count = mesh.positions.len() / 3;

    let positions = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]]);
    let mut entity = GraphicsEntity::new(positions)
        .with_name(model.name)
        .with_indices(mesh.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]));

    if !mesh.normals.is_empty() {
        entity = entity.with_normals(mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]));
    }
    if !mesh.texcoords.is_empty() {
        // OBJ puts the origin at the bottom left, wgpu at the top left
        entity = entity.with_uvs(mesh.texcoords.chunks_exact(2).map(|t| [t[0], 1.0 - t[1]]));
    }
    if !mesh.vertex_color.is_empty() {
        entity = entity.with_colors(mesh.vertex_color.chunks_exact(3).map(|c| [c[0], c[1], c[2]]));
    } else if let Some(diffuse) = material.and_then(|m| m.diffuse) {
        entity = entity.with_colors(std::iter::repeat_n(diffuse, vertex_count));
    }
    if let Some(texture) = material.and_then(|m| m.diffuse_texture.as_ref()) {
        entity = entity.with_texture(base.join(texture));
    }
    entity
}

/// Load the diffuse texture an entity points at. Entities without a texture
/// get `None` and are drawn with the white fallback.
pub fn load_entity_texture(
    entity: &GraphicsEntity,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Result<Option<Texture>, RendererError> {
    let Some(path) = entity.texture_path().filter(|_| entity.has_texture()) else {
        return Ok(None);
    };
    load_texture(path, device, queue)
        .map(Some)
        .map_err(|e| RendererError::Texture {
            path: path.to_path_buf(),
            message: format!("{e:#}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_an_error() {
        assert!(load_obj("no/such/model.obj").is_err());
    }
}
