use std::mem;

use wgpu::{CommandEncoder, RenderPass};

use crate::graph::DeclaredDependency;

/// Handle to a declared renderpass output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderPassHandle;

#[derive(Default)]
pub(super) enum Recorder<'a, 'pass> {
    Encoder(&'a mut CommandEncoder),
    RenderPass(&'a mut RenderPass<'pass>),
    #[default]
    Taken,
}

/// What a node records its commands into: the renderpass it declared, or the
/// bare encoder if it declared none. Each can be taken once.
pub struct RenderGraphEncoderOrPass<'a, 'pass>(pub(super) Recorder<'a, 'pass>);

impl<'a, 'pass> RenderGraphEncoderOrPass<'a, 'pass> {
    /// The encoder of a node without a renderpass.
    pub fn take_encoder(&mut self) -> Option<&'a mut CommandEncoder> {
        match mem::take(&mut self.0) {
            Recorder::Encoder(encoder) => Some(encoder),
            other => {
                log::error!("Node asked for an encoder it does not own");
                self.0 = other;
                None
            }
        }
    }

    /// The renderpass the node declared with `_handle`.
    pub fn take_rpass(&mut self, _handle: DeclaredDependency<RenderPassHandle>) -> Option<&'a mut RenderPass<'pass>> {
        match mem::take(&mut self.0) {
            Recorder::RenderPass(rpass) => Some(rpass),
            other => {
                log::error!("Node asked for a renderpass it does not own");
                self.0 = other;
                None
            }
        }
    }
}
