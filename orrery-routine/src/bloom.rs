//! Separable gaussian blur of the brightness attachment.
//!
//! Each iteration is one direction of the blur; two iterations make one full
//! gaussian. See [`blur_chain`](crate::schedule::blur_chain) for how sources
//! and targets alternate.

use orrery::{
    graph::{NodeResourceUsage, RenderGraph, RenderPassTarget, RenderPassTargets, RenderTargetHandle},
    util::{bind_merge::BindGroupBuilder, typedefs::FastHashMap},
};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    BindGroup, Buffer, BufferUsages, Color, Device, PipelineLayoutDescriptor, RenderPipeline,
};

use crate::{
    common::{create_fullscreen_pipeline, Samplers, ShaderInterfaces},
    error::{validated, RoutineError},
    schedule::{BloomSource, BlurDirection, BlurStep},
    shaders::create_shader_module,
    state::HDR_FORMAT,
    targets::FrameTargets,
    uniforms::BlurUniforms,
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BloomSettings {
    /// Blur iterations, alternating horizontal and vertical.
    pub passes: u32,
    /// Multiplier on the glow added back in the composite.
    pub strength: f32,
    pub exposure: f32,
    /// Gamma applied when the surface doesn't convert to sRGB itself.
    pub gamma: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            passes: 10,
            strength: 1.0,
            exposure: 1.0,
            gamma: 2.2,
        }
    }
}

const SOURCES: [BloomSource; 3] = [BloomSource::Bright, BloomSource::BlurA, BloomSource::BlurB];
const DIRECTIONS: [BlurDirection; 2] = [BlurDirection::Horizontal, BlurDirection::Vertical];

pub struct BloomRoutine {
    pipeline: RenderPipeline,
    horizontal: Buffer,
    vertical: Buffer,
    /// Rebuilt whenever the targets are.
    bind_groups: FastHashMap<(BloomSource, BlurDirection), BindGroup>,
}

impl BloomRoutine {
    pub fn new(device: &Device, interfaces: &ShaderInterfaces) -> Result<Self, RoutineError> {
        profiling::scope!("BloomRoutine::new");

        let module = create_shader_module(device, "blur.wgsl")?;
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("blur"),
            bind_group_layouts: &[&interfaces.blur_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, "blur pipeline", || {
            create_fullscreen_pipeline(device, "blur", &layout, &module, HDR_FORMAT)
        })?;

        let direction_buffer = |direction: BlurDirection| {
            device.create_buffer_init(&BufferInitDescriptor {
                label: Some("blur direction"),
                contents: bytemuck::bytes_of(&BlurUniforms::new(direction.vector())),
                usage: BufferUsages::UNIFORM,
            })
        };

        Ok(Self {
            pipeline,
            horizontal: direction_buffer(BlurDirection::Horizontal),
            vertical: direction_buffer(BlurDirection::Vertical),
            bind_groups: FastHashMap::default(),
        })
    }

    /// Creates a bind group for every source and direction pair. Sources that
    /// failed to allocate are left out and their blur passes do nothing.
    pub fn rebind(
        &mut self,
        device: &Device,
        interfaces: &ShaderInterfaces,
        samplers: &Samplers,
        targets: &FrameTargets,
    ) {
        profiling::scope!("BloomRoutine::rebind");

        self.bind_groups.clear();
        for source in SOURCES {
            let Some(view) = targets.bloom(source).view() else {
                continue;
            };
            for direction in DIRECTIONS {
                let uniforms = match direction {
                    BlurDirection::Horizontal => &self.horizontal,
                    BlurDirection::Vertical => &self.vertical,
                };
                let bg = BindGroupBuilder::new()
                    .append_texture_view(view)
                    .append_sampler(&samplers.clamp)
                    .append_buffer(uniforms)
                    .build(device, Some("blur"), &interfaces.blur_bgl);
                self.bind_groups.insert((source, direction), bg);
            }
        }
    }

    pub fn add_to_graph<'node>(
        &'node self,
        graph: &mut RenderGraph<'node>,
        step: BlurStep,
        source: RenderTargetHandle,
        target: RenderTargetHandle,
    ) {
        let mut builder = graph.add_node("Blur");

        builder.add_render_target(source, NodeResourceUsage::Input);
        let output = builder.add_render_target(target, NodeResourceUsage::Output);

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

            let Some(bg) = self.bind_groups.get(&(step.source, step.direction)) else {
                return;
            };

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, bg, &[]);
            rpass.draw(0..3, 0..1);
        });
    }
}
