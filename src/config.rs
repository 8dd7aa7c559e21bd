//! Window and viewer configuration.
//!
//! The library only consumes [`WindowConfig`] and [`ViewerConfig`]; the
//! [`ViewerArgs`] parser exists for the sample-scene binary.

use std::path::PathBuf;

use clap::Parser;

/// Default clear colour, a desaturated blue-grey.
pub const DEFAULT_CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.45,
    g: 0.55,
    b: 0.60,
    a: 1.00,
};

#[derive(Clone, Debug, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: String::from("lee-framework"),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

impl WindowConfig {
    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }
}

/// Everything the sample binary needs to set up a scene.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub shader: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub gui: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            shader: None,
            model: None,
            gui: true,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sample-scene", about = "Render a small 3D scene with an ImGui overlay")]
pub struct ViewerArgs {
    /// Window width in physical pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Window height in physical pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    #[arg(long, default_value = "lee-framework")]
    pub title: String,

    /// WGSL shader with `vs_main` and `fs_main` entry points
    #[arg(long)]
    pub shader: Option<PathBuf>,

    /// Wavefront OBJ file to add to the scene
    #[arg(long)]
    pub model: Option<PathBuf>,

    #[arg(long)]
    pub no_gui: bool,

    #[arg(long)]
    pub no_vsync: bool,
}

impl From<ViewerArgs> for ViewerConfig {
    fn from(args: ViewerArgs) -> Self {
        Self {
            window: WindowConfig {
                title: args.title,
                width: args.width,
                height: args.height,
                vsync: !args.no_vsync,
            },
            shader: args.shader,
            model: args.model,
            gui: !args.no_gui,
        }
    }
}
