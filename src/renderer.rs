//! The renderer and the builder that assembles it.
//!
//! ```no_run
//! # async fn demo(window: std::sync::Arc<winit::window::Window>) -> Result<(), lee_framework::error::RendererError> {
//! use lee_framework::{data_structures::graphics_entity::GraphicsEntity, pipelines::light::Light, renderer::RendererBuilder};
//!
//! let mut renderer = RendererBuilder::new()
//!     .camera([3.0, 2.0, 3.0], [0.0, 0.0, 0.0])
//!     .light(Light::new([5.0, 5.0, 5.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [0.0, 0.0, 0.0]))
//!     .gui()
//!     .build(window)
//!     .await?;
//! renderer.add_entity(GraphicsEntity::triangle())?;
//! renderer.render()?;
//! # Ok(())
//! # }
//! ```

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use cgmath::{Deg, Point3};
use instant::Duration;
use winit::{event::WindowEvent, window::Window};

use crate::{
    camera::{Camera, CameraResources, Projection},
    config::{DEFAULT_CLEAR_COLOR, WindowConfig},
    context::{Context, RenderTarget},
    data_structures::graphics_entity::{EntityId, GraphicsEntity},
    error::RendererError,
    gui::{GuiState, GuiWrapper, SceneInfo, premultiply},
    pipelines::{
        entity::{entity_bind_group_layout, mk_entity_pipeline},
        light::{Light, LightResources},
    },
    resources::{mesh::load_entity_texture, shader::Shader},
};

/// Fluent configuration of a [`Renderer`]. Every setter consumes the builder
/// and hands it back.
#[derive(Debug, Clone)]
pub struct RendererBuilder {
    camera: Camera,
    fovy: Deg<f32>,
    znear: f32,
    zfar: f32,
    light: Light,
    shader: Option<PathBuf>,
    gui: bool,
    window: WindowConfig,
    clear_color: wgpu::Color,
}

impl Default for RendererBuilder {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 100.0,
            light: Light::default(),
            shader: None,
            gui: false,
            window: WindowConfig::default(),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

impl RendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look from `eye` at `target`.
    pub fn camera<E: Into<Point3<f32>>, T: Into<Point3<f32>>>(mut self, eye: E, target: T) -> Self {
        self.camera = Camera::new(eye, target);
        self
    }

    pub fn perspective(mut self, fovy: Deg<f32>, znear: f32, zfar: f32) -> Self {
        self.fovy = fovy;
        self.znear = znear;
        self.zfar = zfar;
        self
    }

    pub fn light(mut self, light: Light) -> Self {
        self.light = light;
        self
    }

    /// Use the WGSL file at `path` instead of the built-in shader.
    pub fn shader(mut self, path: impl Into<PathBuf>) -> Self {
        self.shader = Some(path.into());
        self
    }

    pub fn gui(mut self) -> Self {
        self.gui = true;
        self
    }

    pub fn init(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    pub fn clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn window_config(&self) -> &WindowConfig {
        &self.window
    }

    pub fn camera_config(&self) -> &Camera {
        &self.camera
    }

    pub fn light_config(&self) -> &Light {
        &self.light
    }

    pub fn shader_path(&self) -> Option<&std::path::Path> {
        self.shader.as_deref()
    }

    pub fn gui_enabled(&self) -> bool {
        self.gui
    }

    /// Create the GPU context for `window` and everything drawn into it.
    pub async fn build(self, window: Arc<Window>) -> Result<Renderer, RendererError> {
        let ctx = Context::new(window.clone(), &self.window).await?;
        let gui = if self.gui {
            Some(GuiWrapper::new(
                window,
                &ctx.device,
                &ctx.queue,
                ctx.format(),
                GuiState::with_clear_color(self.clear_color),
            )?)
        } else {
            None
        };
        Renderer::new(ctx, self, gui)
    }

    /// Like [`Self::build`] but draws into a `width` x `height` offscreen
    /// texture. The GUI needs a window and is left out.
    pub async fn build_headless(self, width: u32, height: u32) -> Result<Renderer, RendererError> {
        if self.gui {
            log::warn!("the GUI overlay is not available without a window");
        }
        let ctx = Context::headless(width, height).await?;
        Renderer::new(ctx, self, None)
    }
}

#[derive(Debug)]
pub struct Renderer {
    ctx: Context,
    camera: CameraResources,
    light: LightResources,
    entity_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    entities: BTreeMap<EntityId, GraphicsEntity>,
    next_id: u64,
    gui: Option<GuiWrapper>,
    clear_color: wgpu::Color,
}

impl Renderer {
    fn new(ctx: Context, builder: RendererBuilder, gui: Option<GuiWrapper>) -> Result<Self, RendererError> {
        let shader = Shader::from_optional_file(builder.shader.as_deref())?;
        let (width, height) = ctx.size();

        let projection = Projection::new(width, height, builder.fovy, builder.znear, builder.zfar);
        let camera = CameraResources::new(&ctx.device, builder.camera, projection);
        let light = LightResources::new(&ctx.device, builder.light);
        let entity_layout = entity_bind_group_layout(&ctx.device);
        let pipeline = mk_entity_pipeline(
            &ctx.device,
            ctx.format(),
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &entity_layout,
            shader.descriptor(),
        );
        log::info!("renderer ready: {}x{}, shader {}", width, height, shader.label());

        Ok(Self {
            ctx,
            camera,
            light,
            entity_layout,
            pipeline,
            entities: BTreeMap::new(),
            next_id: 0,
            gui,
            clear_color: builder.clear_color,
        })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.ctx.window()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.camera.projection
    }

    pub fn light(&self) -> &Light {
        &self.light.light
    }

    pub fn light_mut(&mut self) -> &mut Light {
        &mut self.light.light
    }

    pub fn gui_state(&self) -> Option<&GuiState> {
        self.gui.as_ref().map(|gui| &gui.state)
    }

    /// The colour frames are cleared to, before premultiplication.
    pub fn clear_color(&self) -> wgpu::Color {
        match &self.gui {
            Some(gui) => {
                let [r, g, b, a] = gui.state.clear_color;
                wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: a as f64,
                }
            }
            None => self.clear_color,
        }
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
        if let Some(gui) = &mut self.gui {
            gui.state.clear_color = [color.r as f32, color.g as f32, color.b as f32, color.a as f32];
        }
    }

    /// Validate `entity`, fill in normals if it has none and upload it.
    pub fn add_entity(&mut self, mut entity: GraphicsEntity) -> Result<EntityId, RendererError> {
        entity.validate()?;
        entity.generate_normals();
        let texture = load_entity_texture(&entity, &self.ctx.device, &self.ctx.queue)?;
        entity.upload(&self.ctx.device, &self.ctx.queue, &self.entity_layout, texture);

        let id = EntityId(self.next_id);
        self.next_id += 1;
        log::info!("added entity {} as {:?}", entity.name, id);
        self.entities.insert(id, entity);
        Ok(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&GraphicsEntity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut GraphicsEntity> {
        self.entities.get_mut(&id)
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Result<GraphicsEntity, RendererError> {
        self.entities.remove(&id).ok_or(RendererError::UnknownEntity(id))
    }

    /// Entities in the order they were added.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &GraphicsEntity)> {
        self.entities.iter().map(|(id, entity)| (*id, entity))
    }

    /// Reconfigure a lost or outdated surface at the window's current size.
    pub fn reconfigure(&mut self) {
        self.ctx.reconfigure();
        let (width, height) = self.ctx.size();
        self.camera.projection.resize(width, height);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
        if width > 0 && height > 0 {
            self.camera.projection.resize(width, height);
        }
    }

    /// Returns `true` when the event was consumed, by the GUI or the camera.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        if let Some(gui) = &mut self.gui {
            if gui.handle_event(event) {
                return true;
            }
        }
        self.camera.controller.handle_window_events(event)
    }

    /// Advance the camera controller and push camera, light and entity
    /// transforms (including mirrored physics bodies) to the GPU.
    pub fn update(&mut self, dt: Duration) {
        self.camera.controller.update(&mut self.camera.camera, dt);
        self.camera.write_to_buffer(&self.ctx.queue);
        self.light.write_to_buffer(&self.ctx.queue);
        for entity in self.entities.values() {
            entity.write_to_buffer(&self.ctx.queue);
        }
    }

    /// Draw one frame: the scene, then the GUI on top, then present.
    pub fn render(&mut self) -> Result<(), RendererError> {
        if !self.ctx.is_ready() {
            return Ok(());
        }
        let frame = match &self.ctx.target {
            RenderTarget::Surface { surface, .. } => Some(surface.get_current_texture()?),
            RenderTarget::Offscreen { .. } => None,
        };
        let view = match (&frame, &self.ctx.target) {
            (Some(frame), _) => frame.texture.create_view(&wgpu::TextureViewDescriptor::default()),
            (None, RenderTarget::Offscreen { texture, .. }) => {
                texture.create_view(&wgpu::TextureViewDescriptor::default())
            }
            (None, RenderTarget::Surface { .. }) => return Ok(()),
        };

        if let Some(gui) = &mut self.gui {
            let mut scene = SceneInfo {
                eye: self.camera.camera.eye.into(),
                target: self.camera.camera.target.into(),
                light_position: self.light.light.position.into(),
                entity_count: self.entities.len(),
            };
            gui.build_frame(&mut scene);
            if scene.light_position != Into::<[f32; 3]>::into(self.light.light.position) {
                self.light.light.position = scene.light_position.into();
                self.light.write_to_buffer(&self.ctx.queue);
            }
        }

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.draw_scene(&mut encoder, &view);
        if let Some(gui) = &mut self.gui {
            gui.draw(&mut encoder, &view)?;
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        if let Some(frame) = frame {
            self.ctx.window().inspect(|window| window.pre_present_notify());
            frame.present();
        }
        Ok(())
    }

    fn draw_scene(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let clear = match &self.gui {
            Some(gui) => gui.state.premultiplied_clear(),
            None => premultiply([
                self.clear_color.r as f32,
                self.clear_color.g as f32,
                self.clear_color.b as f32,
                self.clear_color.a as f32,
            ]),
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.ctx.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
            multiview_mask: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
        render_pass.set_bind_group(1, &self.light.bind_group, &[]);
        for entity in self.entities.values() {
            let Some(gpu) = entity.gpu() else {
                log::warn!("{} was never uploaded", entity.name);
                continue;
            };
            render_pass.set_bind_group(2, &gpu.bind_group, &[]);
            render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            render_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..gpu.num_elements, 0, 0..1);
        }
    }

    /// Render a frame into the offscreen target and read it back.
    pub async fn render_to_image(&mut self) -> Result<image::RgbaImage, RendererError> {
        let (width, height) = match &self.ctx.target {
            RenderTarget::Offscreen { width, height, .. } => (*width, *height),
            RenderTarget::Surface { .. } => return Err(RendererError::NotHeadless),
        };
        self.render()?;

        let RenderTarget::Offscreen { texture, .. } = &self.ctx.target else {
            return Err(RendererError::NotHeadless);
        };
        let unpadded_bytes_per_row = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        self.ctx
            .device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .map_err(|e| RendererError::Readback(e.to_string()))?;
        rx.receive()
            .await
            .ok_or_else(|| RendererError::Readback(String::from("map callback dropped")))?
            .map_err(|e| RendererError::Readback(e.to_string()))?;

        let pixels = {
            let data = buffer_slice.get_mapped_range();
            data.chunks(padded_bytes_per_row as usize)
                .flat_map(|row| &row[..unpadded_bytes_per_row as usize])
                .copied()
                .collect::<Vec<u8>>()
        };
        output_buffer.unmap();

        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RendererError::Readback(String::from("pixel buffer has the wrong size")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let builder = RendererBuilder::new();
        assert_eq!(builder.camera_config().eye, Point3::new(3.0, 2.0, 3.0));
        assert_eq!(builder.camera_config().target, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(builder.light_config().position, cgmath::Vector3::new(5.0, 5.0, 5.0));
        assert_eq!(builder.window_config(), &WindowConfig::default());
        assert!(!builder.gui_enabled());
        assert!(builder.shader_path().is_none());
        assert_eq!(builder.clear_color, DEFAULT_CLEAR_COLOR);
        assert_eq!(builder.fovy, Deg(45.0));
        assert_eq!((builder.znear, builder.zfar), (0.1, 100.0));
    }

    #[test]
    fn builder_setters_chain() {
        let light = Light::new(
            [5.0, 5.0, 5.0],
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 0.0, 0.0],
        );
        let builder = RendererBuilder::new()
            .camera([1.0, 1.0, 1.0], [0.0, 1.0, 0.0])
            .light(light)
            .shader("shaders/flat.wgsl")
            .gui()
            .init(WindowConfig {
                title: String::from("test"),
                width: 640,
                height: 480,
                vsync: false,
            })
            .clear_color(wgpu::Color::BLACK);
        assert_eq!(builder.camera_config().eye, Point3::new(1.0, 1.0, 1.0));
        assert_eq!(builder.light_config(), &light);
        assert_eq!(builder.shader_path(), Some(std::path::Path::new("shaders/flat.wgsl")));
        assert!(builder.gui_enabled());
        assert_eq!(builder.window_config().width, 640);
        assert_eq!(builder.clear_color, wgpu::Color::BLACK);
    }
}
