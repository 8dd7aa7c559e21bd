//! Renderable entities.
//!
//! A [`GraphicsEntity`] owns the CPU-side geometry of one object (positions,
//! triangle indices and the optional UV, normal and colour attributes), its
//! model transform and, once uploaded, the GPU buffers it is drawn from.
//!
//! Optional attributes are either absent (empty) or carry exactly one entry per
//! position. Which attributes are present decides the capability flags the
//! shader sees, see [`GraphicsEntity::has_normal`], [`GraphicsEntity::has_texture`]
//! and [`GraphicsEntity::has_material`].
//!
//! An entity may mirror a physics body: when a [`TransformSource`] is attached
//! its world matrix replaces the entity's own transform every frame.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector2, Vector3, Zero};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{texture::Texture, transform::Transform},
    error::EntityError,
};

/// Handle returned by [`crate::renderer::Renderer::add_entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Something that owns the authoritative world transform of an entity,
/// typically a rigid body of a physics engine.
pub trait TransformSource: Send + Sync {
    fn world_matrix(&self) -> Matrix4<f32>;
}

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EntityVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex for EntityVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<EntityVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Per-entity uniform. The normal matrix is stored as a 4x4 to satisfy the
/// uniform alignment rules; only its upper 3x3 block is meaningful.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EntityUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    // has_texture, has_normal, has_material, unused
    flags: [u32; 4],
}

impl EntityUniform {
    pub fn new(model: Matrix4<f32>, flags: [bool; 3]) -> Self {
        Self {
            model: model.into(),
            normal: Matrix4::from(normal_matrix(&model)).into(),
            flags: [flags[0] as u32, flags[1] as u32, flags[2] as u32, 0],
        }
    }

    pub fn flags(&self) -> [u32; 4] {
        self.flags
    }
}

/// Inverse transpose of the upper 3x3 block, identity for singular matrices.
pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
    let linear = Matrix3::from_cols(model.x.truncate(), model.y.truncate(), model.z.truncate());
    linear
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(Matrix3::identity)
}

/// GPU side of an uploaded entity: the vertex buffer ("VBO"), the index buffer
/// ("EBO") and the per-entity uniform with its bind group.
#[derive(Debug)]
pub struct GpuEntity {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub texture: Texture,
}

pub struct GraphicsEntity {
    pub name: String,
    positions: Vec<Vector3<f32>>,
    indices: Vec<[u32; 3]>,
    uvs: Vec<Vector2<f32>>,
    normals: Vec<Vector3<f32>>,
    colors: Vec<Vector3<f32>>,
    pub transform: Transform,
    mirror: Option<Arc<dyn TransformSource>>,
    texture_path: Option<PathBuf>,
    gpu: Option<GpuEntity>,
}

impl fmt::Debug for GraphicsEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsEntity")
            .field("name", &self.name)
            .field("vertices", &self.positions.len())
            .field("triangles", &self.triangle_count())
            .field("has_normal", &self.has_normal())
            .field("has_texture", &self.has_texture())
            .field("has_material", &self.has_material())
            .field("mirrored", &self.mirror.is_some())
            .field("uploaded", &self.gpu.is_some())
            .finish()
    }
}

impl GraphicsEntity {
    pub fn new<P: Into<Vector3<f32>>>(positions: impl IntoIterator<Item = P>) -> Self {
        Self {
            name: String::from("entity"),
            positions: positions.into_iter().map(Into::into).collect(),
            indices: Vec::new(),
            uvs: Vec::new(),
            normals: Vec::new(),
            colors: Vec::new(),
            transform: Transform::default(),
            mirror: None,
            texture_path: None,
            gpu: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_indices(mut self, indices: impl IntoIterator<Item = [u32; 3]>) -> Self {
        self.indices = indices.into_iter().collect();
        self
    }

    pub fn with_uvs<U: Into<Vector2<f32>>>(mut self, uvs: impl IntoIterator<Item = U>) -> Self {
        self.uvs = uvs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_normals<N: Into<Vector3<f32>>>(mut self, normals: impl IntoIterator<Item = N>) -> Self {
        self.normals = normals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_colors<C: Into<Vector3<f32>>>(mut self, colors: impl IntoIterator<Item = C>) -> Self {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_texture(mut self, path: impl AsRef<Path>) -> Self {
        self.texture_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn TransformSource>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// The hard-coded RGB triangle of the sample scene, drawn without indices.
    pub fn triangle() -> Self {
        Self::new([[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]])
            .with_name("triangle")
            .with_colors([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
            .with_uvs([[0.0, 1.0], [1.0, 1.0], [0.5, 0.0]])
    }

    /// A square of side `size` in the XZ plane facing +Y.
    pub fn plane(size: f32) -> Self {
        let h = size / 2.0;
        Self::new([[-h, 0.0, -h], [-h, 0.0, h], [h, 0.0, h], [h, 0.0, -h]])
            .with_name("plane")
            .with_indices([[0, 1, 2], [0, 2, 3]])
            .with_normals([[0.0, 1.0, 0.0]; 4])
            .with_uvs([[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]])
    }

    /// An axis-aligned cube of edge `size` centred on the origin, with flat
    /// normals (four vertices per face).
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        // (normal, u, v) with u x v == normal so each face winds counter-clockwise
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(12);
        for (n, u, v) in faces {
            let (n, u, v) = (Vector3::from(n), Vector3::from(u), Vector3::from(v));
            let c = n * h;
            let base = positions.len() as u32;
            positions.extend([c - u * h - v * h, c + u * h - v * h, c + u * h + v * h, c - u * h + v * h]);
            normals.extend([n; 4]);
            uvs.extend([[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
            indices.extend([[base, base + 1, base + 2], [base, base + 2, base + 3]]);
        }
        Self::new(positions)
            .with_name("cube")
            .with_indices(indices)
            .with_normals(normals)
            .with_uvs(uvs)
    }

    pub fn positions(&self) -> &[Vector3<f32>] {
        &self.positions
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn normals(&self) -> &[Vector3<f32>] {
        &self.normals
    }

    pub fn texture_path(&self) -> Option<&Path> {
        self.texture_path.as_deref()
    }

    pub fn has_normal(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.positions.len()
    }

    pub fn has_texture(&self) -> bool {
        self.texture_path.is_some() && !self.uvs.is_empty() && self.uvs.len() == self.positions.len()
    }

    pub fn has_material(&self) -> bool {
        !self.colors.is_empty() && self.colors.len() == self.positions.len()
    }

    /// Number of vertex attributes carrying real data, position included.
    pub fn attribute_count(&self) -> u32 {
        1 + [!self.uvs.is_empty(), !self.normals.is_empty(), !self.colors.is_empty()]
            .into_iter()
            .filter(|present| *present)
            .count() as u32
    }

    pub fn triangle_count(&self) -> usize {
        if self.indices.is_empty() {
            self.positions.len() / 3
        } else {
            self.indices.len()
        }
    }

    pub fn validate(&self) -> Result<(), EntityError> {
        let expected = self.positions.len();
        if expected == 0 {
            return Err(EntityError::NoPositions);
        }
        for (attribute, actual) in [
            ("uvs", self.uvs.len()),
            ("normals", self.normals.len()),
            ("colors", self.colors.len()),
        ] {
            if actual != 0 && actual != expected {
                return Err(EntityError::AttributeLength {
                    attribute,
                    expected,
                    actual,
                });
            }
        }
        if self.indices.is_empty() {
            if expected % 3 != 0 {
                return Err(EntityError::NotTriangulated(expected));
            }
        } else if let Some(&index) = self
            .indices
            .iter()
            .flatten()
            .find(|&&index| index as usize >= expected)
        {
            return Err(EntityError::IndexOutOfRange {
                index,
                vertex_count: expected,
            });
        }
        Ok(())
    }

    fn triangles(&self) -> Vec<[usize; 3]> {
        if self.indices.is_empty() {
            (0..self.positions.len() / 3)
                .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
                .collect()
        } else {
            self.indices
                .iter()
                .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
                .collect()
        }
    }

    /// Fill in smooth normals when the entity has none. Each face contributes
    /// its normal weighted by its area; vertices that only touch degenerate
    /// triangles fall back to +Y.
    pub fn generate_normals(&mut self) {
        if self.has_normal() {
            return;
        }
        let mut normals = vec![Vector3::zero(); self.positions.len()];
        for [a, b, c] in self.triangles() {
            let (p0, p1, p2) = (self.positions[a], self.positions[b], self.positions[c]);
            let face = (p1 - p0).cross(p2 - p0);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = normals
            .into_iter()
            .map(|n| {
                if n.magnitude2() > f32::EPSILON {
                    n.normalize()
                } else {
                    Vector3::unit_y()
                }
            })
            .collect();
    }

    /// Interleave the attributes into the layout described by [`EntityVertex::desc`].
    pub fn vertices(&self) -> Vec<EntityVertex> {
        (0..self.positions.len())
            .map(|i| EntityVertex {
                position: self.positions[i].into(),
                tex_coords: self.uvs.get(i).map_or([0.0, 0.0], |&uv| uv.into()),
                normal: self.normals.get(i).map_or([0.0; 3], |&n| n.into()),
                color: self.colors.get(i).map_or([1.0; 3], |&c| c.into()),
            })
            .collect()
    }

    pub fn index_data(&self) -> Vec<u32> {
        if self.indices.is_empty() {
            (0..self.positions.len() as u32).collect()
        } else {
            self.indices.iter().flatten().copied().collect()
        }
    }

    /// The mirrored physics transform if there is one, the entity's own otherwise.
    pub fn model_matrix(&self) -> Matrix4<f32> {
        match &self.mirror {
            Some(mirror) => mirror.world_matrix(),
            None => self.transform.to_matrix(),
        }
    }

    pub fn uniform(&self) -> EntityUniform {
        EntityUniform::new(
            self.model_matrix(),
            [self.has_texture(), self.has_normal(), self.has_material()],
        )
    }

    pub fn gpu(&self) -> Option<&GpuEntity> {
        self.gpu.as_ref()
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    /// Create the vertex, index and uniform buffers. `texture` is bound as the
    /// diffuse map; entities without one get a white texture.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        texture: Option<Texture>,
    ) {
        let vertices = self.vertices();
        let indices = self.index_data();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", self.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Uniform Buffer", self.name)),
            contents: bytemuck::cast_slice(&[self.uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let texture = texture.unwrap_or_else(|| Texture::white(device, queue));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some(&format!("{} Bind Group", self.name)),
        });

        self.gpu = Some(GpuEntity {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            uniform_buffer,
            bind_group,
            texture,
        });
        self.log_summary();
    }

    /// Push the current model matrix and flags to the GPU.
    pub fn write_to_buffer(&self, queue: &wgpu::Queue) {
        if let Some(gpu) = &self.gpu {
            queue.write_buffer(&gpu.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniform()]));
        }
    }

    pub fn log_summary(&self) {
        log::debug!(
            "{}: {} vertices, {} triangles, {} attributes",
            self.name,
            self.positions.len(),
            self.triangle_count(),
            self.attribute_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Quaternion, Rotation3};
    use std::sync::Mutex;

    #[test]
    fn triangle_is_valid_and_coloured() {
        let triangle = GraphicsEntity::triangle();
        assert_eq!(triangle.validate(), Ok(()));
        assert!(triangle.has_material());
        assert!(!triangle.has_normal());
        // UVs alone do not make a textured entity
        assert!(!triangle.has_texture());
        assert_eq!(triangle.attribute_count(), 3);
        assert_eq!(triangle.index_data(), vec![0, 1, 2]);
    }

    #[test]
    fn texture_flag_needs_uvs_and_a_path() {
        let entity = GraphicsEntity::plane(1.0).with_texture("checker.png");
        assert!(entity.has_texture());
        let entity = GraphicsEntity::new([[0.0, 0.0, 0.0]; 3]).with_texture("checker.png");
        assert!(!entity.has_texture());
    }

    #[test]
    fn rejects_empty_entities() {
        let entity = GraphicsEntity::new(Vec::<[f32; 3]>::new());
        assert_eq!(entity.validate(), Err(EntityError::NoPositions));
    }

    #[test]
    fn rejects_mismatched_attributes() {
        let entity = GraphicsEntity::new([[0.0, 0.0, 0.0]; 3]).with_normals([[0.0, 1.0, 0.0]; 2]);
        assert_eq!(
            entity.validate(),
            Err(EntityError::AttributeLength {
                attribute: "normals",
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let entity = GraphicsEntity::new([[0.0, 0.0, 0.0]; 3]).with_indices([[0, 1, 3]]);
        assert_eq!(
            entity.validate(),
            Err(EntityError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn rejects_loose_vertices_without_indices() {
        let entity = GraphicsEntity::new([[0.0, 0.0, 0.0]; 4]);
        assert_eq!(entity.validate(), Err(EntityError::NotTriangulated(4)));
        let entity = entity.with_indices([[0, 1, 2], [0, 2, 3]]);
        assert_eq!(entity.validate(), Ok(()));
    }

    #[test]
    fn interleaving_fills_missing_attributes_with_defaults() {
        let entity = GraphicsEntity::new([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
        let vertices = entity.vertices();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1].position, [4.0, 5.0, 6.0]);
        assert_eq!(vertices[1].tex_coords, [0.0, 0.0]);
        assert_eq!(vertices[1].normal, [0.0, 0.0, 0.0]);
        assert_eq!(vertices[1].color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn generated_normals_follow_the_winding() {
        let mut triangle = GraphicsEntity::triangle();
        triangle.generate_normals();
        assert!(triangle.has_normal());
        for n in triangle.normals() {
            assert!((n.magnitude() - 1.0).abs() < 1e-5);
            assert!((n.z - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn generated_normals_are_smoothed_across_shared_vertices() {
        // two faces of a tent sharing the ridge edge 0-1
        let mut tent = GraphicsEntity::new([
            [0.0, 1.0, -1.0],
            [0.0, 1.0, 1.0],
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
        ])
        .with_indices([[0, 1, 2], [1, 0, 3]]);
        tent.generate_normals();
        let ridge = tent.normals()[0];
        assert!(ridge.x.abs() < 1e-5);
        assert!((ridge.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn degenerate_triangles_fall_back_to_up() {
        let mut line = GraphicsEntity::new([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        line.generate_normals();
        assert_eq!(line.normals()[0], Vector3::unit_y());
    }

    #[test]
    fn existing_normals_are_kept() {
        let mut plane = GraphicsEntity::plane(2.0).with_normals([[1.0, 0.0, 0.0]; 4]);
        plane.generate_normals();
        assert_eq!(plane.normals()[0], Vector3::unit_x());
    }

    #[test]
    fn cube_faces_point_outwards() {
        let cube = GraphicsEntity::cube(2.0);
        assert_eq!(cube.validate(), Ok(()));
        assert_eq!(cube.positions().len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        for tri in cube.indices() {
            let [a, b, c] = tri.map(|i| cube.positions()[i as usize]);
            let face = (b - a).cross(c - a).normalize();
            let centre = (a + b + c) / 3.0;
            assert!(face.dot(centre) > 0.0);
            assert!((face - cube.normals()[tri[0] as usize]).magnitude() < 1e-5);
        }
    }

    struct Body(Mutex<Vector3<f32>>);
    impl TransformSource for Body {
        fn world_matrix(&self) -> Matrix4<f32> {
            Matrix4::from_translation(*self.0.lock().unwrap())
        }
    }

    #[test]
    fn mirror_overrides_the_local_transform() {
        let body = Arc::new(Body(Mutex::new(Vector3::new(0.0, 5.0, 0.0))));
        let entity = GraphicsEntity::cube(1.0)
            .with_transform(Transform::from_position(Vector3::new(9.0, 9.0, 9.0)))
            .with_mirror(body.clone());
        assert_eq!(entity.model_matrix().w.truncate(), Vector3::new(0.0, 5.0, 0.0));
        *body.0.lock().unwrap() = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!(entity.model_matrix().w.truncate(), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn uniform_flags_mirror_capabilities() {
        let uniform = GraphicsEntity::triangle().uniform();
        assert_eq!(uniform.flags(), [0, 0, 1, 0]);
        let uniform = GraphicsEntity::plane(1.0).with_texture("a.png").uniform();
        assert_eq!(uniform.flags(), [1, 1, 0, 0]);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Transform::default()
            .with_rotation(Quaternion::from_angle_y(Deg(90.0)))
            .with_scale(Vector3::new(1.0, 4.0, 1.0))
            .to_matrix();
        let n = normal_matrix(&model) * Vector3::new(0.0, 1.0, 0.0);
        assert!((n.y - 0.25).abs() < 1e-5);
        let singular = Matrix4::from_nonuniform_scale(1.0, 0.0, 1.0);
        assert_eq!(normal_matrix(&singular), Matrix3::identity());
    }
}
