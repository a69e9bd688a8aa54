//! Outline around the highlighted body.
//!
//! The body is drawn again slightly enlarged with a flat color, but only where
//! the opaque pass did not stamp the highlight stencil value, which leaves a
//! rim around its silhouette. Depth is ignored so the rim shows through
//! anything in front of the body.

use orrery::graph::RenderGraph;
use wgpu::{Device, PipelineLayoutDescriptor, RenderPipeline};

use crate::{
    common::{create_hdr_pipeline, FrameBindings, HdrPipelineDescriptor, ShaderInterfaces},
    error::{validated, RoutineError},
    scene::{ObjectDraw, SceneResources},
    shaders::create_shader_module,
    state::{PassKind, STENCIL_HIGHLIGHT},
    targets::HdrTargets,
    upload::model_vertex_layout,
};

pub struct OutlineRoutine {
    pipeline: RenderPipeline,
}

impl OutlineRoutine {
    pub fn new(device: &Device, interfaces: &ShaderInterfaces) -> Result<Self, RoutineError> {
        profiling::scope!("OutlineRoutine::new");

        let module = create_shader_module(device, "model.wgsl")?;
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("outline"),
            bind_group_layouts: &[&interfaces.frame_bgl, &interfaces.object_bgl, &interfaces.texture_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = validated(device, "outline pipeline", || {
            create_hdr_pipeline(
                device,
                HdrPipelineDescriptor {
                    label: "outline",
                    layout: &layout,
                    module: &module,
                    vertex_entry: "vs_outline",
                    fragment_entry: "fs_outline",
                    buffers: &[model_vertex_layout()],
                    kind: PassKind::Outline,
                },
            )
        })?;

        Ok(Self { pipeline })
    }

    pub fn add_to_graph<'node>(
        &'node self,
        graph: &mut RenderGraph<'node>,
        hdr: HdrTargets,
        bindings: &'node FrameBindings,
        resources: &'node SceneResources,
        draw: &'node ObjectDraw,
    ) {
        let mut builder = graph.add_node("Outline");
        let rpass_handle = hdr.add_renderpass(&mut builder);

        builder.build(move |mut ctx| {
            let Some(rpass) = ctx.encoder_or_pass.take_rpass(rpass_handle) else {
                return;
            };

            rpass.set_pipeline(&self.pipeline);
            rpass.set_stencil_reference(STENCIL_HIGHLIGHT);
            rpass.set_bind_group(0, &bindings.frame_bg, &[]);
            resources.record(rpass, &bindings.object_bg, draw, 0..1);
        });
    }
}
