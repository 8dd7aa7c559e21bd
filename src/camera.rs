//! Look-at camera, perspective projection and an orbit controller.
//!
//! The camera is described the way the scene is authored: an eye position
//! looking at a target point. [`CameraController`] orbits the eye around the
//! target with the left mouse button and zooms with the scroll wheel.

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

/// cgmath produces OpenGL clip space (z in -1..1), wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_PITCH: f32 = FRAC_PI_2 - 0.01;
const MIN_DISTANCE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<E: Into<Point3<f32>>, T: Into<Point3<f32>>>(eye: E, target: T) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn distance(&self) -> f32 {
        (self.eye - self.target).magnitude()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new((3.0, 2.0, 3.0), (0.0, 0.0, 0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.eye.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.view_matrix()).into();
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.view_proj.into()
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Orbits the camera eye around its target.
#[derive(Debug, Clone)]
pub struct CameraController {
    rotate_horizontal: f32,
    rotate_vertical: f32,
    scroll: f32,
    speed: f32,
    sensitivity: f32,
    dragging: bool,
    last_cursor: Option<PhysicalPosition<f64>>,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            scroll: 0.0,
            speed,
            sensitivity,
            dragging: false,
            last_cursor: None,
        }
    }

    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.rotate_horizontal += dx as f32;
        self.rotate_vertical += dy as f32;
    }

    pub fn handle_scroll(&mut self, delta: &MouseScrollDelta) {
        self.scroll += match delta {
            MouseScrollDelta::LineDelta(_, scroll) => *scroll,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32 / 100.0,
        };
    }

    /// Returns `true` when the event was used to steer the camera.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
                if !self.dragging {
                    self.last_cursor = None;
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let used = if let (true, Some(last)) = (self.dragging, self.last_cursor) {
                    self.handle_mouse(position.x - last.x, position.y - last.y);
                    true
                } else {
                    false
                };
                self.last_cursor = Some(*position);
                used
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.handle_scroll(delta);
                true
            }
            _ => false,
        }
    }

    /// Applies the input gathered since the last call. Without input the
    /// camera is left exactly where it is.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        if self.rotate_horizontal == 0.0 && self.rotate_vertical == 0.0 && self.scroll == 0.0 {
            return;
        }
        let dt = dt.as_secs_f32();
        let offset = camera.eye - camera.target;
        let radius = offset.magnitude();
        if radius <= f32::EPSILON {
            self.reset();
            return;
        }

        let mut yaw = offset.z.atan2(offset.x);
        let mut pitch = (offset.y / radius).clamp(-1.0, 1.0).asin();
        yaw += self.rotate_horizontal * self.sensitivity * dt;
        pitch += self.rotate_vertical * self.sensitivity * dt;
        pitch = pitch.clamp(-SAFE_PITCH, SAFE_PITCH);

        let zoom = 1.0 - self.scroll * self.speed * dt;
        let radius = (radius * zoom.max(0.1)).max(MIN_DISTANCE);

        let (sin_pitch, cos_pitch) = pitch.sin_cos();
        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        camera.eye = camera.target
            + Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw) * radius;

        self.reset();
    }

    fn reset(&mut self) {
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;
        self.scroll = 0.0;
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(4.0, 0.4)
    }
}

/// Camera state together with its GPU uniform.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub projection: Projection,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: Camera, projection: Projection) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            projection,
            controller: CameraController::default(),
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Recomputes the uniform and uploads it.
    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue) {
        self.uniform.update_view_proj(&self.camera, &self.projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, EuclideanSpace, Transform};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn target_lies_on_the_negative_view_axis() {
        let camera = Camera::default();
        let in_view = camera.view_matrix().transform_point(camera.target);
        assert!(approx(in_view.x, 0.0));
        assert!(approx(in_view.y, 0.0));
        assert!(approx(in_view.z, -camera.distance()));
    }

    #[test]
    fn projection_maps_near_plane_to_zero_depth() {
        let projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        let clip = projection.calc_matrix() * cgmath::Vector4::new(0.0, 0.0, -0.1, 1.0);
        assert!(approx(clip.z / clip.w, 0.0));
        let clip = projection.calc_matrix() * cgmath::Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert!(approx(clip.z / clip.w, 1.0));
    }

    #[test]
    fn resize_guards_against_zero_height() {
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        projection.resize(640, 0);
        assert!(projection.aspect().is_finite());
        projection.resize(1000, 500);
        assert!(approx(projection.aspect(), 2.0));
    }

    #[test]
    fn uniform_carries_eye_position() {
        let camera = Camera::new((1.0, 2.0, 3.0), Point3::origin());
        let projection = Projection::new(4, 3, Deg(60.0), 0.1, 10.0);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);
        assert_eq!(uniform.view_position, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn idle_controller_keeps_the_eye_in_place() {
        let mut camera = Camera::default();
        let before = camera.eye;
        CameraController::default().update(&mut camera, Duration::from_millis(16));
        assert!(approx(camera.eye.x, before.x));
        assert!(approx(camera.eye.y, before.y));
        assert!(approx(camera.eye.z, before.z));
    }

    #[test]
    fn idle_controller_leaves_a_steep_camera_untouched() {
        let mut camera = Camera::new((0.0, 10.0, 0.01), Point3::origin());
        let before = camera;
        let mut controller = CameraController::default();
        for _ in 0..10 {
            controller.update(&mut camera, Duration::from_millis(16));
        }
        assert_eq!(camera, before);
    }

    #[test]
    fn orbiting_preserves_distance() {
        let mut camera = Camera::default();
        let distance = camera.distance();
        let mut controller = CameraController::default();
        controller.handle_mouse(120.0, -40.0);
        controller.update(&mut camera, Duration::from_millis(100));
        assert!(approx(camera.distance(), distance));
        assert!(camera.eye != Camera::default().eye);
    }

    #[test]
    fn scrolling_forward_zooms_in() {
        let mut camera = Camera::default();
        let distance = camera.distance();
        let mut controller = CameraController::default();
        controller.handle_scroll(&MouseScrollDelta::LineDelta(0.0, 1.0));
        controller.update(&mut camera, Duration::from_millis(100));
        assert!(camera.distance() < distance);
        assert!(camera.distance() >= MIN_DISTANCE);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_pole() {
        let mut camera = Camera::default();
        let mut controller = CameraController::default();
        controller.handle_mouse(0.0, 1.0e6);
        controller.update(&mut camera, Duration::from_secs(1));
        let offset = (camera.eye - camera.target).normalize();
        assert!(offset.y < 1.0);
        assert!(offset.x.abs() > 0.0 || offset.z.abs() > 0.0);
    }
}
