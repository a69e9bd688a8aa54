use std::mem::size_of;

use orrery::util::bind_merge::BindGroupBuilder;
use wgpu::{BindGroup, Buffer, BufferDescriptor, BufferUsages, Device, Queue};

use crate::{
    common::{Samplers, ShaderInterfaces},
    error::{allocated, RoutineError},
    uniforms::{FrameUniforms, ObjectSlots, ObjectUniforms, MAX_OBJECTS, OBJECT_UNIFORM_STRIDE},
};

/// Uniform buffers written once per frame and the bind groups every scene pass uses.
pub struct FrameBindings {
    frame_buffer: Buffer,
    object_buffer: Buffer,
    /// Group 0: frame uniforms and the linear sampler.
    pub frame_bg: BindGroup,
    /// Group 1: per-object uniforms, addressed by dynamic offset.
    pub object_bg: BindGroup,
}

impl FrameBindings {
    pub fn new(device: &Device, interfaces: &ShaderInterfaces, samplers: &Samplers) -> Result<Self, RoutineError> {
        profiling::scope!("FrameBindings::new");

        let (frame_buffer, object_buffer) = allocated(device, "frame uniform buffers", || {
            let frame = device.create_buffer(&BufferDescriptor {
                label: Some("frame uniforms"),
                size: size_of::<FrameUniforms>() as u64,
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let object = device.create_buffer(&BufferDescriptor {
                label: Some("object uniforms"),
                size: MAX_OBJECTS as u64 * OBJECT_UNIFORM_STRIDE,
                usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            (frame, object)
        })?;

        let frame_bg = BindGroupBuilder::new()
            .append_buffer(&frame_buffer)
            .append_sampler(&samplers.linear)
            .build(device, Some("frame bg"), &interfaces.frame_bgl);

        let object_bg = BindGroupBuilder::new()
            .append_buffer_with_size(&object_buffer, size_of::<ObjectUniforms>() as u64)
            .build(device, Some("object bg"), &interfaces.object_bgl);

        Ok(Self {
            frame_buffer,
            object_buffer,
            frame_bg,
            object_bg,
        })
    }

    pub fn write(&self, queue: &Queue, frame: &FrameUniforms, objects: &ObjectSlots) {
        profiling::scope!("FrameBindings::write");

        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(frame));
        if !objects.is_empty() {
            queue.write_buffer(&self.object_buffer, 0, objects.as_bytes());
        }
    }
}
