//! Rendergraph used for all per-frame render work scheduling.
//!
//! Start with [`RenderGraph::new`], add render targets and nodes, then
//! [`RenderGraph::execute`] to record and submit everything.
//!
//! # High Level Overview
//!
//! The graph consists of a series of nodes which have inputs and outputs.
//! Inputs and outputs are render targets, or the "external" resource standing
//! in for side effects the graph can't see. Nodes run in the order they were
//! added. Before running, the graph is planned:
//!
//! - Nodes touching a render target whose descriptor is invalid are dropped,
//!   with an error logged.
//! - Nodes whose outputs nobody consumes are pruned. Output targets (the
//!   surface) and the external resource are consumed by definition.
//! - Consecutive nodes with compatible renderpasses share a single renderpass.
//! - Every attachment is cleared by the renderpass that first uses it and
//!   loaded afterwards.
//!
//! Planning is pure and can be inspected with [`RenderGraph::plan`].
//!
//! # Render Targets
//!
//! Targets are owned outside the graph and imported by reference. Bind groups
//! that sample from them are created alongside the targets, so no node ever
//! needs a temporary that has to outlive its renderpass.
//!
//! # Nodes
//!
//! Nodes are made with [`RenderGraphNodeBuilder`]. The builder is used to
//! declare all the dependencies of the node, then
//! [`RenderGraphNodeBuilder::build`] is called with the callback that records
//! the node's commands.

use glam::UVec2;
use orrery_types::{TextureFormat, TextureUsages};
use thiserror::Error;
use wgpu::Color;

use crate::util::typedefs::SsoString;

mod encpass;
#[allow(clippy::module_inception)]
mod graph;
mod node;

pub use encpass::*;
pub use graph::*;
pub use node::*;

/// Why a render target can't be used this frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Render target {label:?} has a zero sized extent {resolution}")]
    ZeroExtent { label: Option<SsoString>, resolution: UVec2 },
    #[error("Render target {label:?} is used as an attachment but lacks RENDER_ATTACHMENT usage")]
    NotRenderable { label: Option<SsoString> },
    #[error("Render target {label:?} has no view to render to")]
    MissingView { label: Option<SsoString> },
}

/// Description of a single render target.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDescriptor {
    pub label: Option<SsoString>,
    pub resolution: UVec2,
    pub format: TextureFormat,
    pub usage: TextureUsages,
}

impl RenderTargetDescriptor {
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.resolution.x == 0 || self.resolution.y == 0 {
            return Err(GraphError::ZeroExtent {
                label: self.label.clone(),
                resolution: self.resolution,
            });
        }
        if !self.usage.contains(TextureUsages::RENDER_ATTACHMENT) {
            return Err(GraphError::NotRenderable {
                label: self.label.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GraphResource {
    Texture(usize),
    External,
}

/// Handle to a graph-imported render target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle {
    pub(super) idx: usize,
}

impl RenderTargetHandle {
    pub fn resource(self) -> GraphResource {
        GraphResource::Texture(self.idx)
    }
}

/// Targets that make up a renderpass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassTargets {
    /// Color targets
    pub targets: Vec<RenderPassTarget>,
    /// Depth-stencil target
    pub depth_stencil: Option<RenderPassDepthTarget>,
}

impl RenderPassTargets {
    /// Determines if two renderpasses have compatible targets.
    ///
    /// `this: Some, other: Some` will check the contents.
    /// Anything involving `None` is false, encoder nodes never share anything.
    pub fn compatible(this: Option<&Self>, other: Option<&Self>) -> bool {
        match (this, other) {
            (Some(this), Some(other)) => {
                let targets_compatible = this.targets.len() == other.targets.len()
                    && this
                        .targets
                        .iter()
                        .zip(other.targets.iter())
                        .all(|(me, you)| me.color.handle == you.color.handle && me.clear == you.clear);

                let depth_compatible = match (&this.depth_stencil, &other.depth_stencil) {
                    (Some(this_depth), Some(other_depth)) => {
                        this_depth.target.handle == other_depth.target.handle
                            && this_depth.depth_clear == other_depth.depth_clear
                            && this_depth.stencil_clear == other_depth.stencil_clear
                    }
                    (None, None) => true,
                    _ => false,
                };

                targets_compatible && depth_compatible
            }
            _ => false,
        }
    }

    pub(super) fn handles(&self) -> impl Iterator<Item = RenderTargetHandle> + '_ {
        self.targets
            .iter()
            .map(|t| t.color.handle)
            .chain(self.depth_stencil.iter().map(|d| d.target.handle))
    }
}

/// Color target in a renderpass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassTarget {
    /// Color attachment. Must be declared as a dependency of the node before it
    /// can be used.
    pub color: DeclaredDependency<RenderTargetHandle>,
    /// Color the attachment will be cleared with if this is the first use.
    pub clear: Color,
}

/// Depth target in a renderpass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDepthTarget {
    /// The target to use as depth.
    pub target: DeclaredDependency<RenderTargetHandle>,
    /// Depth value the attachment will be cleared with if this is the first
    /// use.
    pub depth_clear: Option<f32>,
    /// Stencil value the attachment will be cleared with if this is the first
    /// use.
    pub stencil_clear: Option<u32>,
}
