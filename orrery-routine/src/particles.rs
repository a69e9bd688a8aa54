//! Camera facing particle quads, one instanced draw per emitter.

use std::{mem::size_of, ops::Range};

use orrery::{
    graph::RenderGraph,
    types::{BlendMode, ParticleAbi},
    world::ParticleBatch,
};
use wgpu::{Buffer, BufferDescriptor, BufferUsages, Device, PipelineLayoutDescriptor, Queue, RenderPipeline};

use crate::{
    common::{create_hdr_pipeline, FrameBindings, HdrPipelineDescriptor, ShaderInterfaces},
    error::{validated, RoutineError},
    shaders::create_shader_module,
    state::PassKind,
    targets::HdrTargets,
    upload::particle_layout,
};

/// Vertices in one particle quad.
const QUAD_VERTICES: u32 = 6;

pub struct ParticleRoutine {
    additive: RenderPipeline,
    alpha: RenderPipeline,
    opaque: RenderPipeline,
    buffer: Buffer,
    /// Capacity of `buffer` in particles.
    capacity: usize,
    staging: Vec<ParticleAbi>,
    /// Range of instances each batch occupies in `buffer`, by batch index.
    ranges: Vec<Range<u32>>,
}

impl ParticleRoutine {
    pub fn new(device: &Device, interfaces: &ShaderInterfaces) -> Result<Self, RoutineError> {
        profiling::scope!("ParticleRoutine::new");

        let module = create_shader_module(device, "particle.wgsl")?;
        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("particles"),
            bind_group_layouts: &[&interfaces.frame_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = |label, blend| {
            create_hdr_pipeline(
                device,
                HdrPipelineDescriptor {
                    label,
                    layout: &layout,
                    module: &module,
                    vertex_entry: "vs_main",
                    fragment_entry: "fs_main",
                    buffers: &[particle_layout()],
                    kind: PassKind::Particles(blend),
                },
            )
        };

        let (additive, alpha, opaque) = validated(device, "particle pipelines", || {
            (
                pipeline("additive particles", BlendMode::Additive),
                pipeline("alpha particles", BlendMode::Alpha),
                pipeline("opaque particles", BlendMode::Opaque),
            )
        })?;

        let capacity = 1024;
        Ok(Self {
            additive,
            alpha,
            opaque,
            buffer: create_buffer(device, capacity),
            capacity,
            staging: Vec::with_capacity(capacity),
            ranges: Vec::new(),
        })
    }

    fn pipeline(&self, blend: BlendMode) -> &RenderPipeline {
        match blend {
            BlendMode::Additive => &self.additive,
            BlendMode::Alpha => &self.alpha,
            BlendMode::Opaque => &self.opaque,
        }
    }

    /// Packs every batch into the instance buffer, growing it if needed.
    pub fn prepare(&mut self, device: &Device, queue: &Queue, batches: &[ParticleBatch]) {
        profiling::scope!("ParticleRoutine::prepare");

        self.staging.clear();
        self.ranges.clear();
        for batch in batches {
            let start = self.staging.len() as u32;
            self.staging.extend_from_slice(&batch.instances);
            self.ranges.push(start..self.staging.len() as u32);
        }

        if self.staging.len() > self.capacity {
            self.capacity = self.staging.len().next_power_of_two();
            log::debug!("Growing particle buffer to {} particles", self.capacity);
            self.buffer = create_buffer(device, self.capacity);
        }

        if !self.staging.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.staging));
        }
    }

    pub fn add_to_graph<'node>(
        &'node self,
        graph: &mut RenderGraph<'node>,
        hdr: HdrTargets,
        bindings: &'node FrameBindings,
        batch: usize,
        blend: BlendMode,
    ) {
        let Some(range) = self.ranges.get(batch).cloned() else {
            log::error!("Particle batch {batch} was never prepared");
            return;
        };

        let mut builder = graph.add_node("Particles");
        let rpass_handle = hdr.add_renderpass(&mut builder);

        builder.build(move |mut ctx| {
            let Some(rpass) = ctx.encoder_or_pass.take_rpass(rpass_handle) else {
                return;
            };

            rpass.set_pipeline(self.pipeline(blend));
            rpass.set_bind_group(0, &bindings.frame_bg, &[]);
            rpass.set_vertex_buffer(0, self.buffer.slice(..));
            rpass.draw(0..QUAD_VERTICES, range);
        });
    }
}

fn create_buffer(device: &Device, capacity: usize) -> Buffer {
    device.create_buffer(&BufferDescriptor {
        label: Some("particle instances"),
        size: (capacity * size_of::<ParticleAbi>()) as u64,
        usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
