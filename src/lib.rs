//! lee-framework
//!
//! A small 3D scene viewer. A [`renderer::Renderer`] is assembled through a
//! fluent [`renderer::RendererBuilder`] (camera, light, shader, GUI, window
//! parameters), holds a list of [`data_structures::graphics_entity::GraphicsEntity`]
//! values and draws them with a single Blinn-Phong pipeline, optionally with
//! a Dear ImGui overlay on top.
//!
//! High-level modules
//! - `app`: winit event loop driving a renderer
//! - `camera`: look-at camera, projection, orbit controller and uniforms
//! - `config`: window and viewer configuration, CLI arguments
//! - `context`: GPU device/queue and the window surface or offscreen target
//! - `data_structures`: entities, transforms and textures
//! - `error`: error types
//! - `gui`: the ImGui overlay and its panel state
//! - `pipelines`: the entity pipeline and the point light
//! - `renderer`: renderer and builder
//! - `resources`: shader, OBJ and texture loading
//!

pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod gui;
pub mod pipelines;
pub mod renderer;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit;
