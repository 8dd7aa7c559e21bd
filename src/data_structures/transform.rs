//! Position, rotation and scale of an entity.
//!
//! The renderer only ever needs the resulting model matrix, but entities are
//! easier to move around in terms of their decomposed parts.

use std::ops::Mul;

use cgmath::{Matrix4, One, Quaternion, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    pub fn with_rotation(mut self, rotation: Quaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// `parent * child` places `child` in the frame of `parent`.
impl<'a, 'b> Mul<&'b Transform> for &'a Transform {
    type Output = Transform;

    fn mul(self, rhs: &'b Transform) -> Self::Output {
        let scaled_rhs_pos = Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        Transform {
            position: self.position + (self.rotation * scaled_rhs_pos),
            rotation: self.rotation * rhs.rotation,
            scale: Vector3::new(
                self.scale.x * rhs.scale.x,
                self.scale.y * rhs.scale.y,
                self.scale.z * rhs.scale.z,
            ),
        }
    }
}

impl Mul<Transform> for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Self::Output {
        &self * &rhs
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Self::from_position(position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3, SquareMatrix, Transform as _, Point3};

    fn close(a: Matrix4<f32>, b: Matrix4<f32>) -> bool {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        a.iter()
            .flatten()
            .zip(b.iter().flatten())
            .all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform::default().to_matrix(), Matrix4::identity());
    }

    #[test]
    fn applies_scale_then_rotation_then_translation() {
        let t = Transform::from_position(Vector3::new(1.0, 0.0, 0.0))
            .with_rotation(Quaternion::from_angle_z(Deg(90.0)))
            .with_scale(Vector3::new(2.0, 2.0, 2.0));
        let p = t.to_matrix().transform_point(Point3::new(1.0, 0.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y - 2.0).abs() < 1e-5);
        assert!(p.z.abs() < 1e-5);
    }

    #[test]
    fn composition_matches_matrix_product_for_uniform_scale() {
        let parent = Transform::from_position(Vector3::new(0.0, 1.0, 0.0))
            .with_rotation(Quaternion::from_angle_y(Deg(30.0)))
            .with_scale(Vector3::new(3.0, 3.0, 3.0));
        let child = Transform::from_position(Vector3::new(1.0, 2.0, -1.0))
            .with_rotation(Quaternion::from_angle_x(Deg(45.0)));
        let composed = &parent * &child;
        assert!(close(composed.to_matrix(), parent.to_matrix() * child.to_matrix()));
    }
}
