//! Immediate-mode GUI overlay.
//!
//! [`GuiState`] is the plain data the panels edit and can be exercised without
//! a window. [`GuiWrapper`] owns the Dear ImGui context together with its winit
//! platform and wgpu renderer backends and draws the panels on top of the scene.

use std::sync::Arc;

use dear_imgui_rs as imgui;
use dear_imgui_wgpu::{WgpuInitInfo, WgpuRenderer};
use dear_imgui_winit::{HiDpiMode, WinitPlatform};
use winit::{event::WindowEvent, window::Window};

use crate::{config::DEFAULT_CLEAR_COLOR, error::RendererError};

#[derive(Debug, Clone, PartialEq)]
pub struct GuiState {
    pub show_demo_window: bool,
    pub show_another_window: bool,
    pub clear_color: [f32; 4],
    pub f: f32,
    pub counter: u32,
}

impl Default for GuiState {
    fn default() -> Self {
        Self::with_clear_color(DEFAULT_CLEAR_COLOR)
    }
}

impl GuiState {
    pub fn with_clear_color(color: wgpu::Color) -> Self {
        Self {
            show_demo_window: true,
            show_another_window: false,
            clear_color: [color.r as f32, color.g as f32, color.b as f32, color.a as f32],
            f: 0.0,
            counter: 0,
        }
    }

    pub fn press_button(&mut self) {
        self.counter += 1;
    }

    pub fn close_another_window(&mut self) {
        self.show_another_window = false;
    }

    pub fn clear_rgb(&self) -> [f32; 3] {
        let [r, g, b, _] = self.clear_color;
        [r, g, b]
    }

    /// Replace the colour channels of the clear colour. Alpha is not editable
    /// from the panel and stays as configured.
    pub fn set_clear_rgb(&mut self, [r, g, b]: [f32; 3]) {
        self.clear_color = [r, g, b, self.clear_color[3]];
    }

    /// The clear colour with its alpha multiplied into the colour channels.
    pub fn premultiplied_clear(&self) -> wgpu::Color {
        premultiply(self.clear_color)
    }
}

pub fn premultiply([r, g, b, a]: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: (r * a) as f64,
        g: (g * a) as f64,
        b: (b * a) as f64,
        a: a as f64,
    }
}

/// Scene values shown, and partly edited, in the "Scene" panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneInfo {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    pub light_position: [f32; 3],
    pub entity_count: usize,
}

pub struct GuiWrapper {
    context: imgui::Context,
    platform: WinitPlatform,
    renderer: WgpuRenderer,
    window: Arc<Window>,
    pub state: GuiState,
}

impl std::fmt::Debug for GuiWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuiWrapper").field("state", &self.state).finish()
    }
}

impl GuiWrapper {
    pub fn new(
        window: Arc<Window>,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        state: GuiState,
    ) -> Result<Self, RendererError> {
        let mut context = imgui::Context::create();
        context
            .set_ini_filename(None::<String>)
            .map_err(|e| RendererError::Gui(e.to_string()))?;

        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(&window, HiDpiMode::Default, &mut context);

        let init_info = WgpuInitInfo::new(device.clone(), queue.clone(), format);
        let renderer = WgpuRenderer::new(init_info, &mut context)
            .map_err(|e| RendererError::Gui(format!("{e:?}")))?;
        log::info!("GUI initialised for {:?}", format);

        Ok(Self {
            context,
            platform,
            renderer,
            window,
            state,
        })
    }

    /// Feed a window event to the GUI. Returns `true` when the GUI wants the
    /// input for itself, in which case the scene should ignore it.
    pub fn handle_event(&mut self, event: &WindowEvent) -> bool {
        let _ = self
            .platform
            .handle_window_event(&mut self.context, &self.window, event);
        let io = self.context.io();
        match event {
            WindowEvent::KeyboardInput { .. } | WindowEvent::Ime(_) => io.want_capture_keyboard(),
            WindowEvent::CursorMoved { .. }
            | WindowEvent::MouseInput { .. }
            | WindowEvent::MouseWheel { .. }
            | WindowEvent::Touch(_) => io.want_capture_mouse(),
            _ => false,
        }
    }

    /// Start a GUI frame and lay out the panels. Must be followed by [`Self::draw`]
    /// in the same frame.
    pub fn build_frame(&mut self, scene: &mut SceneInfo) {
        self.platform.prepare_frame(&self.window, &mut self.context);
        let ui = self.context.frame();
        build_panels(ui, &mut self.state, scene);
    }

    /// Draw the frame laid out by [`Self::build_frame`] into `view` on top of
    /// what is already there.
    pub fn draw(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) -> Result<(), RendererError> {
        let draw_data = self.context.render();

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GUI Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        self.renderer
            .new_frame()
            .map_err(|e| RendererError::Gui(format!("{e:?}")))?;
        self.renderer
            .render_draw_data(draw_data, &mut render_pass)
            .map_err(|e| RendererError::Gui(format!("{e:?}")))
    }
}

fn build_panels(ui: &imgui::Ui, state: &mut GuiState, scene: &mut SceneInfo) {
    if state.show_demo_window {
        ui.show_demo_window(&mut state.show_demo_window);
    }

    ui.window("Hello, world!")
        .size([380.0, 220.0], imgui::Condition::FirstUseEver)
        .build(|| {
            ui.text("This is some useful text.");
            ui.checkbox("Demo Window", &mut state.show_demo_window);
            ui.checkbox("Another Window", &mut state.show_another_window);
            ui.slider("float", 0.0, 1.0, &mut state.f);
            let mut rgb = state.clear_rgb();
            if ui.color_edit3("clear color", &mut rgb) {
                state.set_clear_rgb(rgb);
            }

            if ui.button("Button") {
                state.press_button();
            }
            ui.same_line();
            ui.text(format!("counter = {}", state.counter));

            let framerate = ui.io().framerate();
            ui.text(format!(
                "Application average {:.3} ms/frame ({:.1} FPS)",
                1000.0 / framerate,
                framerate
            ));
        });

    if state.show_another_window {
        ui.window("Another Window")
            .size([260.0, 100.0], imgui::Condition::FirstUseEver)
            .build(|| {
                ui.text("Hello from another window!");
                if ui.button("Close Me") {
                    state.close_another_window();
                }
            });
    }

    ui.window("Scene")
        .size([300.0, 200.0], imgui::Condition::FirstUseEver)
        .position([20.0, 260.0], imgui::Condition::FirstUseEver)
        .build(|| {
            let [x, y, z] = scene.eye;
            ui.text(format!("eye    ({x:.2}, {y:.2}, {z:.2})"));
            let [x, y, z] = scene.target;
            ui.text(format!("target ({x:.2}, {y:.2}, {z:.2})"));
            ui.separator();
            ui.text("light position");
            for (label, value) in ["x", "y", "z"].iter().zip(scene.light_position.iter_mut()) {
                ui.slider(format!("light {label}"), -20.0, 20.0, value);
            }
            ui.separator();
            ui.text(format!("entities: {}", scene.entity_count));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_like_the_demo() {
        let state = GuiState::default();
        assert!(state.show_demo_window);
        assert!(!state.show_another_window);
        assert_eq!(state.clear_color, [0.45, 0.55, 0.60, 1.00]);
        assert_eq!(state.f, 0.0);
        assert_eq!(state.counter, 0);
    }

    #[test]
    fn button_counts_presses() {
        let mut state = GuiState::default();
        state.press_button();
        state.press_button();
        assert_eq!(state.counter, 2);
    }

    #[test]
    fn close_me_hides_the_second_window() {
        let mut state = GuiState {
            show_another_window: true,
            ..Default::default()
        };
        state.close_another_window();
        assert!(!state.show_another_window);
    }

    #[test]
    fn clear_colour_is_premultiplied() {
        let state = GuiState {
            clear_color: [0.5, 1.0, 0.25, 0.5],
            ..Default::default()
        };
        let color = state.premultiplied_clear();
        assert!((color.r - 0.25).abs() < 1e-6);
        assert!((color.g - 0.5).abs() < 1e-6);
        assert!((color.b - 0.125).abs() < 1e-6);
        assert!((color.a - 0.5).abs() < 1e-6);
    }

    #[test]
    fn colour_edits_keep_the_configured_alpha() {
        let mut state = GuiState::with_clear_color(wgpu::Color {
            r: 0.1,
            g: 0.2,
            b: 0.3,
            a: 1.0,
        });
        assert_eq!(state.clear_rgb(), [0.1, 0.2, 0.3]);
        state.set_clear_rgb([1.0, 0.0, 0.5]);
        assert_eq!(state.clear_color, [1.0, 0.0, 0.5, 1.0]);
        let color = state.premultiplied_clear();
        assert_eq!((color.r, color.g, color.a), (1.0, 0.0, 1.0));
    }

    #[test]
    fn opaque_clear_colour_is_unchanged() {
        let color = premultiply([0.45, 0.55, 0.60, 1.0]);
        assert!((color.r - 0.45).abs() < 1e-6);
        assert!((color.b - 0.60).abs() < 1e-6);
    }
}
