//! Lit and unlit mesh passes: opaque bodies and the ship, the instanced
//! asteroid belt, and light markers. All three share `model.wgsl`.

use orrery::graph::RenderGraph;
use wgpu::{
    Device, PipelineLayout, PipelineLayoutDescriptor, RenderPipeline, ShaderModule, VertexBufferLayout,
};

use crate::{
    common::{create_hdr_pipeline, FrameBindings, HdrPipelineDescriptor, ShaderInterfaces},
    error::{validated, RoutineError},
    scene::{ObjectDraw, SceneResources},
    shaders::create_shader_module,
    state::PassKind,
    targets::HdrTargets,
    upload::{instance_layout, model_vertex_layout},
};

pub struct ForwardRoutine {
    opaque: RenderPipeline,
    instanced: RenderPipeline,
    markers: RenderPipeline,
}

impl ForwardRoutine {
    pub fn new(device: &Device, interfaces: &ShaderInterfaces) -> Result<Self, RoutineError> {
        profiling::scope!("ForwardRoutine::new");

        let module = create_shader_module(device, "model.wgsl")?;
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("forward"),
            bind_group_layouts: &[&interfaces.frame_bgl, &interfaces.object_bgl, &interfaces.texture_bgl],
            push_constant_ranges: &[],
        });

        validated(device, "forward pipelines", || Self {
            opaque: model_pipeline(
                device,
                &layout,
                &module,
                "opaque",
                "vs_main",
                &[model_vertex_layout()],
                PassKind::Opaque,
            ),
            instanced: model_pipeline(
                device,
                &layout,
                &module,
                "instanced",
                "vs_instanced",
                &[model_vertex_layout(), instance_layout()],
                PassKind::Instanced,
            ),
            markers: model_pipeline(
                device,
                &layout,
                &module,
                "light markers",
                "vs_main",
                &[model_vertex_layout()],
                PassKind::LightMarkers,
            ),
        })
    }

    /// Bodies and the ship. Each draw stamps its stencil reference so the outline
    /// pass can find the highlighted body.
    pub fn add_opaque_to_graph<'node>(
        &'node self,
        graph: &mut RenderGraph<'node>,
        hdr: HdrTargets,
        bindings: &'node FrameBindings,
        resources: &'node SceneResources,
        draws: &'node [ObjectDraw],
    ) {
        let mut builder = graph.add_node("Opaque");
        let rpass_handle = hdr.add_renderpass(&mut builder);

        builder.build(move |mut ctx| {
            let Some(rpass) = ctx.encoder_or_pass.take_rpass(rpass_handle) else {
                return;
            };

            rpass.set_pipeline(&self.opaque);
            rpass.set_bind_group(0, &bindings.frame_bg, &[]);
            for draw in draws {
                rpass.set_stencil_reference(draw.stencil_reference);
                resources.record(rpass, &bindings.object_bg, draw, 0..1);
            }
        });
    }

    /// The asteroid belt, one draw for every instance.
    pub fn add_instanced_to_graph<'node>(
        &'node self,
        graph: &mut RenderGraph<'node>,
        hdr: HdrTargets,
        bindings: &'node FrameBindings,
        resources: &'node SceneResources,
        draw: &'node ObjectDraw,
    ) {
        let mut builder = graph.add_node("Instanced");
        let rpass_handle = hdr.add_renderpass(&mut builder);

        builder.build(move |mut ctx| {
            let Some(rpass) = ctx.encoder_or_pass.take_rpass(rpass_handle) else {
                return;
            };

            let Some((instances, count)) = resources.belt_instances() else {
                return;
            };

            rpass.set_pipeline(&self.instanced);
            rpass.set_bind_group(0, &bindings.frame_bg, &[]);
            rpass.set_vertex_buffer(1, instances.slice(..));
            resources.record(rpass, &bindings.object_bg, draw, 0..count);
        });
    }

    pub fn add_markers_to_graph<'node>(
        &'node self,
        graph: &mut RenderGraph<'node>,
        hdr: HdrTargets,
        bindings: &'node FrameBindings,
        resources: &'node SceneResources,
        draws: &'node [ObjectDraw],
    ) {
        let mut builder = graph.add_node("Light Markers");
        let rpass_handle = hdr.add_renderpass(&mut builder);

        builder.build(move |mut ctx| {
            let Some(rpass) = ctx.encoder_or_pass.take_rpass(rpass_handle) else {
                return;
            };

            rpass.set_pipeline(&self.markers);
            rpass.set_bind_group(0, &bindings.frame_bg, &[]);
            for draw in draws {
                resources.record(rpass, &bindings.object_bg, draw, 0..1);
            }
        });
    }
}

fn model_pipeline(
    device: &Device,
    layout: &PipelineLayout,
    module: &ShaderModule,
    label: &'static str,
    vertex_entry: &'static str,
    buffers: &[VertexBufferLayout<'_>],
    kind: PassKind,
) -> RenderPipeline {
    create_hdr_pipeline(
        device,
        HdrPipelineDescriptor {
            label,
            layout,
            module,
            vertex_entry,
            fragment_entry: "fs_main",
            buffers,
            kind,
        },
    )
}
