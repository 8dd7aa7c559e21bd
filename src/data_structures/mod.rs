//! Scene data: what gets drawn and where.
//!
//! - `graphics_entity` holds the geometry of one object and its GPU buffers
//! - `transform` is the position/rotation/scale of an entity
//! - `texture` wraps GPU textures (diffuse maps, depth buffer)

pub mod graphics_entity;
pub mod texture;
pub mod transform;
