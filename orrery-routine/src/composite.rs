//! Final pass: adds the blurred glow to the scene color, tone maps it and
//! writes the surface.

use glam::UVec2;
use orrery::{
    graph::{
        NodeResourceUsage, RenderGraph, RenderPassTarget, RenderPassTargets, RenderTargetDescriptor, RenderTargetHandle,
    },
    util::{bind_merge::BindGroupBuilder, typedefs::FastHashMap},
};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    BindGroup, Buffer, BufferUsages, Color, Device, PipelineLayoutDescriptor, Queue, RenderPipeline, TextureFormat,
    TextureUsages,
};

use crate::{
    bloom::BloomSettings,
    common::{create_fullscreen_pipeline, Samplers, ShaderInterfaces},
    error::{validated, RoutineError},
    schedule::BloomSource,
    shaders::create_shader_module,
    targets::FrameTargets,
    uniforms::CompositeUniforms,
};

const SOURCES: [BloomSource; 3] = [BloomSource::Bright, BloomSource::BlurA, BloomSource::BlurB];

pub struct CompositeRoutine {
    pipeline: RenderPipeline,
    uniforms: Buffer,
    surface_format: TextureFormat,
    /// One per glow source, rebuilt whenever the targets are.
    bind_groups: FastHashMap<BloomSource, BindGroup>,
}

impl CompositeRoutine {
    pub fn new(
        device: &Device,
        interfaces: &ShaderInterfaces,
        surface_format: TextureFormat,
        settings: &BloomSettings,
    ) -> Result<Self, RoutineError> {
        profiling::scope!("CompositeRoutine::new");

        let module = create_shader_module(device, "composite.wgsl")?;
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("composite"),
            bind_group_layouts: &[&interfaces.composite_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, "composite pipeline", || {
            create_fullscreen_pipeline(device, "composite", &layout, &module, surface_format)
        })?;

        let uniforms = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("composite uniforms"),
            contents: bytemuck::bytes_of(&composite_uniforms(settings, surface_format)),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });

        Ok(Self {
            pipeline,
            uniforms,
            surface_format,
            bind_groups: FastHashMap::default(),
        })
    }

    pub fn set_settings(&self, queue: &Queue, settings: &BloomSettings) {
        queue.write_buffer(
            &self.uniforms,
            0,
            bytemuck::bytes_of(&composite_uniforms(settings, self.surface_format)),
        );
    }

    pub fn rebind(
        &mut self,
        device: &Device,
        interfaces: &ShaderInterfaces,
        samplers: &Samplers,
        targets: &FrameTargets,
    ) {
        profiling::scope!("CompositeRoutine::rebind");

        self.bind_groups.clear();
        let Some(hdr) = targets.hdr_color.view() else {
            return;
        };
        for source in SOURCES {
            let Some(bloom) = targets.bloom(source).view() else {
                continue;
            };
            let bg = BindGroupBuilder::new()
                .append_texture_view(hdr)
                .append_texture_view(bloom)
                .append_sampler(&samplers.clamp)
                .append_buffer(&self.uniforms)
                .build(device, Some("composite"), &interfaces.composite_bgl);
            self.bind_groups.insert(source, bg);
        }
    }

    pub fn surface_descriptor(&self, resolution: UVec2) -> RenderTargetDescriptor {
        RenderTargetDescriptor {
            label: Some("surface".into()),
            resolution,
            format: self.surface_format,
            usage: TextureUsages::RENDER_ATTACHMENT,
        }
    }

    pub fn add_to_graph<'node>(
        &'node self,
        graph: &mut RenderGraph<'node>,
        hdr_color: RenderTargetHandle,
        bloom: RenderTargetHandle,
        bloom_source: BloomSource,
        surface: RenderTargetHandle,
    ) {
        let mut builder = graph.add_node("Composite");

        builder.add_render_target(hdr_color, NodeResourceUsage::Input);
        builder.add_render_target(bloom, NodeResourceUsage::Input);
        let output = builder.add_render_target(surface, NodeResourceUsage::Output);

        let rpass_handle = builder.add_renderpass(RenderPassTargets {
            targets: vec![RenderPassTarget {
                color: output,
                clear: Color::BLACK,
            }],
            depth_stencil: None,
        });

        builder.build(move |mut ctx| {
            let Some(rpass) = ctx.encoder_or_pass.take_rpass(rpass_handle) else {
                return;
            };

            let Some(bg) = self.bind_groups.get(&bloom_source) else {
                return;
            };

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, bg, &[]);
            rpass.draw(0..3, 0..1);
        });
    }
}

/// sRGB surfaces apply gamma on write, so the shader must not apply it again.
pub fn composite_uniforms(settings: &BloomSettings, surface_format: TextureFormat) -> CompositeUniforms {
    CompositeUniforms {
        exposure: settings.exposure,
        bloom_strength: settings.strength,
        gamma: if surface_format.is_srgb() {
            1.0
        } else {
            settings.gamma.max(f32::EPSILON)
        },
        _padding: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_surfaces_skip_gamma() {
        let settings = BloomSettings::default();

        let srgb = composite_uniforms(&settings, TextureFormat::Bgra8UnormSrgb);
        assert_eq!(srgb.gamma, 1.0);

        let linear = composite_uniforms(&settings, TextureFormat::Bgra8Unorm);
        assert_eq!(linear.gamma, 2.2);
        assert_eq!(linear.exposure, settings.exposure);
        assert_eq!(linear.bloom_strength, settings.strength);
    }
}
