//! Routine that renders a cubemap as a skybox.

use orrery::{graph::RenderGraph, util::bind_merge::BindGroupBuilder};
use wgpu::{BindGroup, Device, PipelineLayoutDescriptor, RenderPipeline};

use crate::{
    common::{create_hdr_pipeline, FrameBindings, HdrPipelineDescriptor, ShaderInterfaces},
    error::{validated, RoutineError},
    shaders::create_shader_module,
    state::PassKind,
    targets::HdrTargets,
    upload::GpuTexture,
};

/// Skybox rendering routine.
///
/// Draws one fullscreen triangle first thing in the frame, with depth testing
/// and writing off so every later pass draws over it.
pub struct SkyboxRoutine {
    pipeline: RenderPipeline,
    bg: BindGroup,
}

impl SkyboxRoutine {
    pub fn new(device: &Device, interfaces: &ShaderInterfaces, cube: &GpuTexture) -> Result<Self, RoutineError> {
        profiling::scope!("SkyboxRoutine::new");

        let module = create_shader_module(device, "skybox.wgsl")?;
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("skybox pass"),
            bind_group_layouts: &[&interfaces.frame_bgl, &interfaces.cube_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, "skybox pipeline", || {
            create_hdr_pipeline(
                device,
                HdrPipelineDescriptor {
                    label: "skybox pass",
                    layout: &layout,
                    module: &module,
                    vertex_entry: "vs_main",
                    fragment_entry: "fs_main",
                    buffers: &[],
                    kind: PassKind::Skybox,
                },
            )
        })?;

        let bg = BindGroupBuilder::new()
            .append_texture_view(&cube.view)
            .build(device, Some("skybox"), &interfaces.cube_bgl);

        Ok(Self { pipeline, bg })
    }

    /// Add rendering the skybox to the given rendergraph.
    pub fn add_to_graph<'node>(
        &'node self,
        graph: &mut RenderGraph<'node>,
        hdr: HdrTargets,
        bindings: &'node FrameBindings,
    ) {
        let mut builder = graph.add_node("Skybox");
        let rpass_handle = hdr.add_renderpass(&mut builder);

        builder.build(move |mut ctx| {
            let Some(rpass) = ctx.encoder_or_pass.take_rpass(rpass_handle) else {
                return;
            };

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &bindings.frame_bg, &[]);
            rpass.set_bind_group(1, &self.bg, &[]);
            rpass.draw(0..3, 0..1);
        });
    }
}
