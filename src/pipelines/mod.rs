//! Render pipelines and the GPU resources they bind.
//!
//! - `entity` builds the pipeline every [`GraphicsEntity`](crate::data_structures::graphics_entity::GraphicsEntity) is drawn with
//! - `light` holds the point light and its uniform

pub mod entity;
pub mod light;
