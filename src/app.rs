//! Application event loop.
//!
//! [`run`] opens the window described by the builder's [`WindowConfig`](crate::config::WindowConfig),
//! builds the [`Renderer`] for it, hands it to a setup closure that populates
//! the scene and then drives it until the window is closed:
//!
//! 1. window events go to the renderer (GUI first, then the camera controller)
//! 2. on every redraw the renderer is updated with the elapsed time and renders a frame
//! 3. lost or outdated surfaces are reconfigured, `Escape` or closing the window exits

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::{
    error::RendererError,
    renderer::{Renderer, RendererBuilder},
};

/// Populates the scene once the renderer exists.
pub type SceneSetup = Box<dyn FnOnce(&mut Renderer) -> anyhow::Result<()>>;

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    builder: Option<RendererBuilder>,
    setup: Option<SceneSetup>,
    renderer: Option<Renderer>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(builder: RendererBuilder, setup: SceneSetup) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            builder: Some(builder),
            setup: Some(setup),
            renderer: None,
            last_time: Instant::now(),
            error: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (Some(builder), Some(setup)) = (self.builder.take(), self.setup.take()) else {
            return Ok(());
        };
        let config = builder.window_config();
        let attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let mut renderer = self.async_runtime.block_on(builder.build(window.clone()))?;
        setup(&mut renderer)?;
        log::info!("scene ready with {} entities", renderer.entities().count());

        self.last_time = Instant::now();
        window.request_redraw();
        self.renderer = Some(renderer);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };

        let consumed = renderer.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. }
                if !consumed
                    && event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                event_loop.exit()
            }
            WindowEvent::Resized(size) => renderer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                renderer.update(dt);
                match renderer.render() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(RendererError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        renderer.reconfigure();
                    }
                    Err(RendererError::Surface(wgpu::SurfaceError::Timeout)) => {
                        log::warn!("surface timed out, dropping frame");
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.renderer.as_ref().and_then(Renderer::window) {
            window.request_redraw();
        }
    }
}

/// Run the viewer until its window is closed.
pub fn run(builder: RendererBuilder, setup: SceneSetup) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(builder, setup)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
