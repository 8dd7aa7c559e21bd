//! Loading of everything that lives outside the binary: shader sources,
//! OBJ meshes and texture images.
//!
//! Relative paths are resolved against the current working directory.

use std::path::Path;

use anyhow::Context as _;

use crate::data_structures::texture::Texture;

pub mod mesh;
pub mod shader;

pub fn load_string(path: impl AsRef<Path>) -> anyhow::Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

pub fn load_binary(path: impl AsRef<Path>) -> anyhow::Result<Vec<u8>> {
    let path = path.as_ref();
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

pub fn load_texture(
    path: impl AsRef<Path>,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let path = path.as_ref();
    let data = load_binary(path)?;
    Texture::from_bytes(device, queue, &data, &path.display().to_string())
}
