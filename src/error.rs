//! Error types.
//!
//! [`EntityError`] covers malformed entity data and is produced without any GPU
//! involvement. [`RendererError`] covers everything that can go wrong while
//! creating or driving the renderer.

use std::path::PathBuf;

use thiserror::Error;

use crate::data_structures::graphics_entity::EntityId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("entity has no vertex positions")]
    NoPositions,
    #[error("{attribute} has {actual} entries but the entity has {expected} positions")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("{0} positions cannot form a triangle list without indices")]
    NotTriangulated(usize),
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to request a GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create a window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("failed to read shader {path}: {source}")]
    Shader {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid entity: {0}")]
    Entity(#[from] EntityError),
    #[error("failed to load texture {path}: {message}")]
    Texture { path: PathBuf, message: String },
    #[error("gui error: {0}")]
    Gui(String),
    #[error("no entity with id {0:?}")]
    UnknownEntity(EntityId),
    #[error("the renderer draws to a window surface, not an offscreen image")]
    NotHeadless,
    #[error("failed to read back the frame: {0}")]
    Readback(String),
}
