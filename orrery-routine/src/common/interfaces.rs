use std::{mem, num::NonZeroU64};

use orrery::util::bind_merge::BindGroupLayoutBuilder;
use wgpu::{
    BindGroupLayout, BindingType, BufferBindingType, Device, ShaderStages, TextureSampleType, TextureViewDimension,
};

use crate::{
    common::Samplers,
    uniforms::{BlurUniforms, CompositeUniforms, FrameUniforms, ObjectUniforms},
};

/// Bind group layouts shared between routines. Created once; every pipeline
/// layout in the crate is assembled from these.
pub struct ShaderInterfaces {
    /// Group 0 of every scene pass: frame uniforms and the linear sampler.
    pub frame_bgl: BindGroupLayout,
    /// Group 1 of the mesh passes: per-object uniforms behind a dynamic offset.
    pub object_bgl: BindGroupLayout,
    /// Group 2 of the mesh passes: a single 2D texture.
    pub texture_bgl: BindGroupLayout,
    /// Group 1 of the skybox pass.
    pub cube_bgl: BindGroupLayout,
    /// Source texture, sampler and direction for one blur iteration.
    pub blur_bgl: BindGroupLayout,
    /// Scene color, bloom, sampler and tone mapping settings.
    pub composite_bgl: BindGroupLayout,
}

impl ShaderInterfaces {
    pub fn new(device: &Device) -> Self {
        profiling::scope!("ShaderInterfaces::new");

        let mut frame_bglb = BindGroupLayoutBuilder::new();
        frame_bglb.append(
            ShaderStages::VERTEX_FRAGMENT,
            uniform_binding::<FrameUniforms>(false),
            None,
        );
        Samplers::add_to_bgl(&mut frame_bglb);
        let frame_bgl = frame_bglb.build(device, Some("frame bgl"));

        let object_bgl = BindGroupLayoutBuilder::new()
            .append(
                ShaderStages::VERTEX_FRAGMENT,
                uniform_binding::<ObjectUniforms>(true),
                None,
            )
            .build(device, Some("object bgl"));

        let texture_bgl = BindGroupLayoutBuilder::new()
            .append(ShaderStages::FRAGMENT, texture_binding(TextureViewDimension::D2), None)
            .build(device, Some("texture bgl"));

        let cube_bgl = BindGroupLayoutBuilder::new()
            .append(ShaderStages::FRAGMENT, texture_binding(TextureViewDimension::Cube), None)
            .build(device, Some("cube bgl"));

        let mut blur_bglb = BindGroupLayoutBuilder::new();
        blur_bglb.append(ShaderStages::FRAGMENT, texture_binding(TextureViewDimension::D2), None);
        Samplers::add_to_bgl(&mut blur_bglb);
        blur_bglb.append(ShaderStages::FRAGMENT, uniform_binding::<BlurUniforms>(false), None);
        let blur_bgl = blur_bglb.build(device, Some("blur bgl"));

        let mut composite_bglb = BindGroupLayoutBuilder::new();
        composite_bglb
            .append(ShaderStages::FRAGMENT, texture_binding(TextureViewDimension::D2), None)
            .append(ShaderStages::FRAGMENT, texture_binding(TextureViewDimension::D2), None);
        Samplers::add_to_bgl(&mut composite_bglb);
        composite_bglb.append(
            ShaderStages::FRAGMENT,
            uniform_binding::<CompositeUniforms>(false),
            None,
        );
        let composite_bgl = composite_bglb.build(device, Some("composite bgl"));

        Self {
            frame_bgl,
            object_bgl,
            texture_bgl,
            cube_bgl,
            blur_bgl,
            composite_bgl,
        }
    }
}

fn uniform_binding<T>(has_dynamic_offset: bool) -> BindingType {
    BindingType::Buffer {
        ty: BufferBindingType::Uniform,
        has_dynamic_offset,
        min_binding_size: NonZeroU64::new(mem::size_of::<T>() as _),
    }
}

fn texture_binding(view_dimension: TextureViewDimension) -> BindingType {
    BindingType::Texture {
        sample_type: TextureSampleType::Float { filterable: true },
        view_dimension,
        multisampled: false,
    }
}
