use cgmath::Vector3;
use wgpu::util::DeviceExt;

/// A point light with Phong colour terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vector3<f32>,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    /// Constant, linear and quadratic falloff. All zero disables attenuation.
    pub attenuation: Vector3<f32>,
}

impl Light {
    pub fn new<V: Into<Vector3<f32>>>(position: V, ambient: V, diffuse: V, specular: V, attenuation: V) -> Self {
        Self {
            position: position.into(),
            ambient: ambient.into(),
            diffuse: diffuse.into(),
            specular: specular.into(),
            attenuation: attenuation.into(),
        }
    }

    /// Intensity multiplier at `distance` from the light.
    pub fn falloff(&self, distance: f32) -> f32 {
        let [c, l, q]: [f32; 3] = self.attenuation.into();
        let denominator = c + l * distance + q * distance * distance;
        if denominator <= 0.0 { 1.0 } else { 1.0 / denominator }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(
            [5.0, 5.0, 5.0],
            [0.1, 0.1, 0.1],
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 0.0, 0.0],
        )
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    ambient: [f32; 3],
    _padding2: u32,
    diffuse: [f32; 3],
    _padding3: u32,
    specular: [f32; 3],
    _padding4: u32,
    attenuation: [f32; 3],
    _padding5: u32,
}

impl From<&Light> for LightUniform {
    fn from(light: &Light) -> Self {
        Self {
            position: light.position.into(),
            _padding: 0,
            ambient: light.ambient.into(),
            _padding2: 0,
            diffuse: light.diffuse.into(),
            _padding3: 0,
            specular: light.specular.into(),
            _padding4: 0,
            attenuation: light.attenuation.into(),
            _padding5: 0,
        }
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("light_bind_group_layout"),
    })
}

#[derive(Debug)]
pub struct LightResources {
    pub light: Light,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, light: Light) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&[LightUniform::from(&light)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });
        Self {
            light,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn write_to_buffer(&self, queue: &wgpu::Queue) {
        queue.write_buffer(
            &self.buffer,
            0,
            bytemuck::cast_slice(&[LightUniform::from(&self.light)]),
        );
    }
}
