//! Uploading meshes and textures.

use std::mem::size_of;

use orrery::types::{CubeTexture, InstanceAbi, Mesh, ModelVertex, ParticleAbi, Texture};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    Buffer, BufferUsages, Device, Extent3d, ImageCopyTexture, ImageDataLayout, Origin3d, Queue, TextureAspect,
    TextureDescriptor, TextureDimension, TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension,
    VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode,
};

use crate::error::{allocated, RoutineError};

/// Texture formats we upload are all four bytes per texel.
const BYTES_PER_TEXEL: u32 = 4;

pub const MODEL_VERTEX_ATTRIBUTES: [VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2
];

pub const INSTANCE_ATTRIBUTES: [VertexAttribute; 4] = wgpu::vertex_attr_array![
    3 => Float32x4,
    4 => Float32x4,
    5 => Float32x4,
    6 => Float32x4
];

pub const PARTICLE_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: 0,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32,
        offset: 12,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x4,
        offset: 16,
        shader_location: 2,
    },
];

pub fn model_vertex_layout() -> VertexBufferLayout<'static> {
    VertexBufferLayout {
        array_stride: ModelVertex::SIZE,
        step_mode: VertexStepMode::Vertex,
        attributes: &MODEL_VERTEX_ATTRIBUTES,
    }
}

pub fn instance_layout() -> VertexBufferLayout<'static> {
    VertexBufferLayout {
        array_stride: size_of::<InstanceAbi>() as u64,
        step_mode: VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRIBUTES,
    }
}

pub fn particle_layout() -> VertexBufferLayout<'static> {
    VertexBufferLayout {
        array_stride: size_of::<ParticleAbi>() as u64,
        step_mode: VertexStepMode::Instance,
        attributes: &PARTICLE_ATTRIBUTES,
    }
}

pub struct GpuMesh {
    pub vertex_buffer: Buffer,
    pub index_buffer: Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn new(device: &Device, label: &'static str, mesh: &Mesh) -> Result<Self, RoutineError> {
        profiling::scope!("GpuMesh::new", label);

        mesh.validate()
            .map_err(|source| RoutineError::InvalidMesh { label, source })?;

        allocated(device, label, || Self {
            vertex_buffer: device.create_buffer_init(&BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: BufferUsages::INDEX,
            }),
            index_count: mesh.indices.len() as u32,
        })
    }
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: TextureView,
}

impl GpuTexture {
    pub fn new_2d(device: &Device, queue: &Queue, texture: &Texture) -> Result<Self, RoutineError> {
        profiling::scope!("GpuTexture::new_2d");

        check_size(texture.label.as_deref(), texture.data.len(), texture.size.x, texture.size.y, 1)?;

        let size = Extent3d {
            width: texture.size.x,
            height: texture.size.y,
            depth_or_array_layers: 1,
        };
        let gpu = allocated(device, "texture", || {
            device.create_texture(&TextureDescriptor {
                label: texture.label.as_deref(),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: texture.format,
                usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })?;

        write_layer(queue, &gpu, 0, &texture.data, size);
        let view = gpu.create_view(&TextureViewDescriptor::default());

        Ok(Self { texture: gpu, view })
    }

    pub fn new_cube(device: &Device, queue: &Queue, texture: &CubeTexture) -> Result<Self, RoutineError> {
        profiling::scope!("GpuTexture::new_cube");

        for face in &texture.faces {
            check_size(texture.label.as_deref(), face.len(), texture.size, texture.size, 1)?;
        }

        let face_size = Extent3d {
            width: texture.size,
            height: texture.size,
            depth_or_array_layers: 1,
        };
        let gpu = allocated(device, "cube texture", || {
            device.create_texture(&TextureDescriptor {
                label: texture.label.as_deref(),
                size: Extent3d {
                    depth_or_array_layers: 6,
                    ..face_size
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: texture.format,
                usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })?;

        for (layer, face) in texture.faces.iter().enumerate() {
            write_layer(queue, &gpu, layer as u32, face, face_size);
        }
        let view = gpu.create_view(&TextureViewDescriptor {
            dimension: Some(TextureViewDimension::Cube),
            ..TextureViewDescriptor::default()
        });

        Ok(Self { texture: gpu, view })
    }
}

fn check_size(label: Option<&str>, actual: usize, width: u32, height: u32, layers: u32) -> Result<(), RoutineError> {
    let expected = (width * height * layers * BYTES_PER_TEXEL) as usize;
    if actual != expected {
        return Err(RoutineError::TextureDataSize {
            label: label.map(str::to_owned),
            expected,
            actual,
        });
    }
    Ok(())
}

fn write_layer(queue: &Queue, texture: &wgpu::Texture, layer: u32, data: &[u8], size: Extent3d) {
    queue.write_texture(
        ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: Origin3d { x: 0, y: 0, z: layer },
            aspect: TextureAspect::All,
        },
        data,
        ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(size.width * BYTES_PER_TEXEL),
            rows_per_image: Some(size.height),
        },
        size,
    );
}
