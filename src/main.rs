use cgmath::{Deg, Quaternion, Rotation3, Vector3};
use clap::Parser;
use lee_framework::{
    app,
    config::{ViewerArgs, ViewerConfig},
    data_structures::{graphics_entity::GraphicsEntity, transform::Transform},
    pipelines::light::Light,
    renderer::RendererBuilder,
    resources::mesh::load_obj,
};

fn main() {
    let config = ViewerConfig::from(ViewerArgs::parse());
    if let Err(e) = run(config) {
        log::error!("{:#}", e);
        eprintln!("sample-scene: {:#}", e);
        std::process::exit(1);
    }
}

fn run(config: ViewerConfig) -> anyhow::Result<()> {
    let mut builder = RendererBuilder::new()
        .camera([3.0, 2.0, 3.0], [0.0, 0.0, 0.0])
        .light(Light::new(
            [5.0, 5.0, 5.0],
            [0.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 0.0, 0.0],
        ))
        .init(config.window.clone());
    if let Some(shader) = &config.shader {
        builder = builder.shader(shader.clone());
    }
    if config.gui {
        builder = builder.gui();
    }

    let model = config.model.clone();
    app::run(
        builder,
        Box::new(move |renderer| {
            renderer.add_entity(GraphicsEntity::triangle())?;
            renderer.add_entity(
                GraphicsEntity::cube(0.8)
                    .with_colors([[0.9, 0.6, 0.2]; 24])
                    .with_transform(
                        Transform::from_position(Vector3::new(1.5, 0.4, -1.0))
                            .with_rotation(Quaternion::from_angle_y(Deg(30.0))),
                    ),
            )?;
            renderer.add_entity(
                GraphicsEntity::plane(6.0)
                    .with_transform(Transform::from_position(Vector3::new(0.0, -1.0, 0.0))),
            )?;
            if let Some(path) = &model {
                for entity in load_obj(path)? {
                    renderer.add_entity(entity)?;
                }
            }
            Ok(())
        }),
    )
}
