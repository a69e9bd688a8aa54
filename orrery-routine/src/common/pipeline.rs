use wgpu::{
    ColorTargetState, ColorWrites, Device, FragmentState, FrontFace, MultisampleState, PipelineLayout, PolygonMode,
    PrimitiveState, PrimitiveTopology, RenderPipeline, RenderPipelineDescriptor, ShaderModule, TextureFormat,
    VertexBufferLayout, VertexState,
};

use crate::state::{PassKind, HDR_FORMAT};

/// Everything that differs between the pipelines rendering into the HDR target.
pub struct HdrPipelineDescriptor<'a> {
    pub label: &'static str,
    pub layout: &'a PipelineLayout,
    pub module: &'a ShaderModule,
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub buffers: &'a [VertexBufferLayout<'a>],
    pub kind: PassKind,
}

const PRIMITIVE: PrimitiveState = PrimitiveState {
    topology: PrimitiveTopology::TriangleList,
    strip_index_format: None,
    front_face: FrontFace::Ccw,
    cull_mode: None,
    unclipped_depth: false,
    polygon_mode: PolygonMode::Fill,
    conservative: false,
};

/// Creates a pipeline writing both HDR color attachments, with the depth,
/// stencil and blend state of `desc.kind`.
pub fn create_hdr_pipeline(device: &Device, desc: HdrPipelineDescriptor<'_>) -> RenderPipeline {
    profiling::scope!("create_hdr_pipeline", desc.label);

    let blend = desc.kind.blend();
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: VertexState {
            module: desc.module,
            entry_point: desc.vertex_entry,
            compilation_options: Default::default(),
            buffers: desc.buffers,
        },
        primitive: PRIMITIVE,
        depth_stencil: desc.kind.depth_stencil(),
        multisample: MultisampleState::default(),
        fragment: Some(FragmentState {
            module: desc.module,
            entry_point: desc.fragment_entry,
            compilation_options: Default::default(),
            targets: &[
                Some(ColorTargetState {
                    format: HDR_FORMAT,
                    blend,
                    write_mask: ColorWrites::ALL,
                }),
                Some(ColorTargetState {
                    format: HDR_FORMAT,
                    blend,
                    write_mask: desc.kind.bright_write_mask(),
                }),
            ],
        }),
        multiview: None,
    })
}

/// Creates a pipeline drawing a single fullscreen triangle into one target of `format`.
pub fn create_fullscreen_pipeline(
    device: &Device,
    label: &'static str,
    layout: &PipelineLayout,
    module: &ShaderModule,
    format: TextureFormat,
) -> RenderPipeline {
    profiling::scope!("create_fullscreen_pipeline", label);

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: VertexState {
            module,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers: &[],
        },
        primitive: PRIMITIVE,
        depth_stencil: None,
        multisample: MultisampleState::default(),
        fragment: Some(FragmentState {
            module,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(ColorTargetState {
                format,
                blend: None,
                write_mask: ColorWrites::ALL,
            })],
        }),
        multiview: None,
    })
}
