#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use lee_framework::renderer::RendererBuilder;
    use wgpu::Color;

    let mut renderer = common::headless(RendererBuilder::new().clear_color(Color::WHITE));
    let img = common::render(&mut renderer);

    assert_eq!(img.dimensions(), (common::WIDTH, common::HEIGHT));
    let desired_pixel = common::pixel_of(Color::WHITE);
    for pixel in img.pixels() {
        assert_eq!(*pixel, desired_pixel);
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_premultiply_the_clear_colour() {
    use lee_framework::renderer::RendererBuilder;
    use wgpu::Color;

    let transparent_white = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 0.0,
    };
    let mut renderer = common::headless(RendererBuilder::new().clear_color(transparent_white));
    let img = common::render(&mut renderer);

    assert_eq!(*img.get_pixel(0, 0), image::Rgba([0, 0, 0, 0]));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_cover_the_centre_with_a_triangle() {
    use lee_framework::{data_structures::graphics_entity::GraphicsEntity, renderer::RendererBuilder};
    use wgpu::Color;

    let mut renderer = common::headless(
        RendererBuilder::new()
            .camera([0.0, 0.0, 3.0], [0.0, 0.0, 0.0])
            .clear_color(Color::BLACK),
    );
    let id = renderer.add_entity(GraphicsEntity::triangle()).unwrap();
    assert!(renderer.entity(id).unwrap().is_uploaded());
    let img = common::render(&mut renderer);

    let background = common::pixel_of(Color::BLACK);
    let centre = *img.get_pixel(common::WIDTH / 2, common::HEIGHT / 2);
    assert_ne!(centre, background);
    assert_eq!(centre[3], 255);
    assert_eq!(*img.get_pixel(0, 0), background);

    renderer.remove_entity(id).unwrap();
    let img = common::render(&mut renderer);
    assert_eq!(*img.get_pixel(common::WIDTH / 2, common::HEIGHT / 2), background);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_follow_a_moved_entity() {
    use lee_framework::{
        cgmath::Vector3,
        data_structures::{graphics_entity::GraphicsEntity, transform::Transform},
        renderer::RendererBuilder,
    };
    use wgpu::Color;

    let mut renderer = common::headless(
        RendererBuilder::new()
            .camera([0.0, 0.0, 3.0], [0.0, 0.0, 0.0])
            .clear_color(Color::BLACK),
    );
    let id = renderer.add_entity(GraphicsEntity::triangle()).unwrap();
    renderer.entity_mut(id).unwrap().transform = Transform::from_position(Vector3::new(0.0, 10.0, 0.0));
    let img = common::render(&mut renderer);

    let centre = *img.get_pixel(common::WIDTH / 2, common::HEIGHT / 2);
    assert_eq!(centre, common::pixel_of(Color::BLACK));
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_reject_invalid_entities() {
    use lee_framework::{
        data_structures::graphics_entity::GraphicsEntity,
        error::{EntityError, RendererError},
        renderer::RendererBuilder,
    };

    let mut renderer = common::headless(RendererBuilder::new());
    let err = renderer
        .add_entity(GraphicsEntity::new([[0.0, 0.0, 0.0]; 4]))
        .unwrap_err();
    assert!(matches!(err, RendererError::Entity(EntityError::NotTriangulated(4))));
    assert_eq!(renderer.entities().count(), 0);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_upload_a_diffuse_texture() {
    use std::path::Path;

    use lee_framework::{renderer::RendererBuilder, resources::mesh::load_obj};

    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");
    let quad = load_obj(fixtures.join("scene.obj"))
        .unwrap()
        .into_iter()
        .find(|e| e.name == "quad")
        .unwrap();
    assert!(quad.has_texture());

    let mut renderer = common::headless(RendererBuilder::new());
    let id = renderer.add_entity(quad).unwrap();

    let entity = renderer.entity(id).unwrap();
    assert!(entity.has_texture());
    let gpu = entity.gpu().unwrap();
    assert_eq!(gpu.texture.texture.width(), 2);
    assert_eq!(gpu.texture.texture.height(), 2);
    common::render(&mut renderer);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_fail_on_an_unreadable_texture() {
    use std::path::Path;

    use lee_framework::{
        data_structures::graphics_entity::GraphicsEntity, error::RendererError, renderer::RendererBuilder,
    };

    let missing = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("missing.png");
    let mut renderer = common::headless(RendererBuilder::new());
    let err = renderer
        .add_entity(GraphicsEntity::triangle().with_texture(&missing))
        .unwrap_err();

    match err {
        RendererError::Texture { path, .. } => assert_eq!(path, missing),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(renderer.entities().count(), 0);
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_follow_resizes_of_the_offscreen_target() {
    use lee_framework::renderer::RendererBuilder;

    let mut renderer = common::headless(RendererBuilder::new());
    renderer.resize(32, 16);
    assert_eq!(renderer.context().size(), (32, 16));
    assert_eq!(renderer.projection().aspect(), 2.0);
    let img = common::render(&mut renderer);
    assert_eq!(img.dimensions(), (32, 16));

    renderer.resize(0, 0);
    assert_eq!(renderer.context().size(), (32, 16));
    assert_eq!(renderer.projection().aspect(), 2.0);
    let img = common::render(&mut renderer);
    assert_eq!(img.dimensions(), (32, 16));
}
