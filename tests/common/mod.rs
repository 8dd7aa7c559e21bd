use lee_framework::renderer::{Renderer, RendererBuilder};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 64;

pub fn headless(builder: RendererBuilder) -> Renderer {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime
        .block_on(builder.build_headless(WIDTH, HEIGHT))
        .expect("no GPU adapter for the integration tests")
}

pub fn render(renderer: &mut Renderer) -> image::RgbaImage {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    renderer.update(std::time::Duration::from_millis(16));
    runtime.block_on(renderer.render_to_image()).unwrap()
}

pub fn pixel_of(colour: wgpu::Color) -> image::Rgba<u8> {
    let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    image::Rgba([
        f_to_u8(colour.r),
        f_to_u8(colour.g),
        f_to_u8(colour.b),
        f_to_u8(colour.a),
    ])
}
