//! GPU device, queue and the target frames are drawn into.
//!
//! A [`Context`] either presents to a window surface or renders into an
//! offscreen texture that can be read back, which is what the headless
//! renderer and the integration tests use.

use std::sync::Arc;

use winit::window::Window;

use crate::{config::WindowConfig, data_structures::texture::Texture, error::RendererError};

/// Format of offscreen targets.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

#[derive(Debug)]
pub enum RenderTarget {
    Surface {
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        /// False while the window has a zero-sized client area.
        configured: bool,
    },
    Offscreen {
        texture: wgpu::Texture,
        width: u32,
        height: u32,
    },
}

#[derive(Debug)]
pub struct Context {
    pub target: RenderTarget,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub(crate) depth_texture: Texture,
}

impl Context {
    pub async fn new(window: Arc<Window>, window_config: &WindowConfig) -> Result<Self, RendererError> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let surface = instance.create_surface(window.clone())?;
        let adapter = request_adapter(&instance, Some(&surface)).await?;
        let (device, queue) = request_device(&adapter).await?;

        log::info!("Surface");
        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour and relies on an sRGB target for the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RendererError::NoAdapter)?;
        let present_mode = window_config.present_mode();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let configured = size.width > 0 && size.height > 0;
        if configured {
            surface.configure(&device, &config);
        }
        log::debug!("surface {:?} {}x{} {:?}", surface_format, config.width, config.height, present_mode);

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        Ok(Self {
            target: RenderTarget::Surface {
                window,
                surface,
                config,
                configured,
            },
            device,
            queue,
            depth_texture,
        })
    }

    /// A context without a window. Frames are drawn into a `width` x `height`
    /// texture in [`OFFSCREEN_FORMAT`].
    pub async fn headless(width: u32, height: u32) -> Result<Self, RendererError> {
        let (width, height) = (width.max(1), height.max(1));
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let adapter = request_adapter(&instance, None).await?;
        let (device, queue) = request_device(&adapter).await?;

        let texture = create_offscreen_texture(&device, width, height);
        let depth_texture = Texture::create_depth_texture(&device, [width, height], "depth_texture");

        Ok(Self {
            target: RenderTarget::Offscreen {
                texture,
                width,
                height,
            },
            device,
            queue,
            depth_texture,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match &self.target {
            RenderTarget::Surface { config, .. } => config.format,
            RenderTarget::Offscreen { .. } => OFFSCREEN_FORMAT,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match &self.target {
            RenderTarget::Surface { config, .. } => (config.width, config.height),
            RenderTarget::Offscreen { width, height, .. } => (*width, *height),
        }
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        match &self.target {
            RenderTarget::Surface { window, .. } => Some(window),
            RenderTarget::Offscreen { .. } => None,
        }
    }

    /// Whether a frame can be drawn right now.
    pub fn is_ready(&self) -> bool {
        match &self.target {
            RenderTarget::Surface { configured, .. } => *configured,
            RenderTarget::Offscreen { .. } => true,
        }
    }

    /// Resize the target and the depth buffer. A zero width or height leaves
    /// the surface unconfigured until the next non-zero resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            if let RenderTarget::Surface { configured, .. } = &mut self.target {
                *configured = false;
            }
            return;
        }
        match &mut self.target {
            RenderTarget::Surface {
                surface,
                config,
                configured,
                ..
            } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
                *configured = true;
            }
            RenderTarget::Offscreen {
                texture,
                width: w,
                height: h,
            } => {
                *texture = create_offscreen_texture(&self.device, width, height);
                *w = width;
                *h = height;
            }
        }
        self.depth_texture = Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        log::debug!("resized to {}x{}", width, height);
    }

    /// Reconfigure the surface at its current size, after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        let (width, height) = match &self.target {
            RenderTarget::Surface { window, .. } => {
                let size = window.inner_size();
                (size.width, size.height)
            }
            RenderTarget::Offscreen { width, height, .. } => (*width, *height),
        };
        self.resize(width, height);
    }
}

async fn request_adapter(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter, RendererError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| {
            log::error!("{}", e);
            RendererError::NoAdapter
        })?;
    log::info!("adapter: {:?}", adapter.get_info());
    Ok(adapter)
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), RendererError> {
    log::info!("device and queue");
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("lee-framework device"),
            ..Default::default()
        })
        .await?;
    Ok((device, queue))
}

fn create_offscreen_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}
