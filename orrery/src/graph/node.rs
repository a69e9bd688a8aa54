use std::marker::PhantomData;

use wgpu::{Device, Queue};

use crate::{
    graph::{
        GraphResource, RenderGraph, RenderGraphEncoderOrPass, RenderPassHandle, RenderPassTargets, RenderTargetHandle,
    },
    util::typedefs::SsoString,
};

/// Wraps a handle proving you have declared it as a dependency.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeclaredDependency<Handle> {
    pub(super) handle: Handle,
}

impl<Handle: Copy> DeclaredDependency<Handle> {
    pub fn handle(&self) -> Handle {
        self.handle
    }
}

pub struct NodeExecutionContext<'a, 'pass, 'node: 'pass> {
    pub device: &'a Device,
    pub queue: &'a Queue,
    /// Either the asked-for renderpass or a command encoder.
    pub encoder_or_pass: RenderGraphEncoderOrPass<'a, 'pass>,
    pub _phantom: PhantomData<&'node ()>,
}

pub(super) type NodeExec<'node> = Box<dyn for<'a, 'pass> FnOnce(NodeExecutionContext<'a, 'pass, 'node>) + 'node>;

pub(super) struct RenderGraphNode<'node> {
    pub inputs: Vec<GraphResource>,
    pub outputs: Vec<GraphResource>,
    pub references: Vec<GraphResource>,
    pub label: SsoString,
    pub rpass: Option<RenderPassTargets>,
    pub exec: NodeExec<'node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeResourceUsage {
    /// Doesn't access the resource at all, just need access to the resource.
    Reference,
    /// Only reads the resource.
    Input,
    /// Only writes to the resource
    Output,
    /// Reads and writes to the resource.
    InputOutput,
}

/// Builder for a graph node.
///
/// Calling build will automatically add the node to the rendergraph.
pub struct RenderGraphNodeBuilder<'a, 'node> {
    pub(super) graph: &'a mut RenderGraph<'node>,
    pub(super) label: SsoString,
    pub(super) inputs: Vec<GraphResource>,
    pub(super) outputs: Vec<GraphResource>,
    pub(super) references: Vec<GraphResource>,
    pub(super) rpass: Option<RenderPassTargets>,
}
impl<'a, 'node> RenderGraphNodeBuilder<'a, 'node> {
    fn add_resource(&mut self, resource: GraphResource, usage: NodeResourceUsage) {
        match usage {
            NodeResourceUsage::Reference => self.references.push(resource),
            NodeResourceUsage::Input => self.inputs.push(resource),
            NodeResourceUsage::Output => self.outputs.push(resource),
            NodeResourceUsage::InputOutput => {
                self.inputs.push(resource);
                self.outputs.push(resource)
            }
        }
    }

    /// Declares a rendertarget used by this node.
    pub fn add_render_target(
        &mut self,
        handle: RenderTargetHandle,
        usage: NodeResourceUsage,
    ) -> DeclaredDependency<RenderTargetHandle> {
        self.add_resource(handle.resource(), usage);
        DeclaredDependency { handle }
    }

    /// Sugar over [add_render_target] which makes it easy to
    /// declare optional textures.
    ///
    /// [add_render_target]: RenderGraphNodeBuilder::add_render_target
    pub fn add_optional_render_target(
        &mut self,
        handle: Option<RenderTargetHandle>,
        usage: NodeResourceUsage,
    ) -> Option<DeclaredDependency<RenderTargetHandle>> {
        Some(self.add_render_target(handle?, usage))
    }

    /// Declares a renderpass that will be written to. Declaring a renderpass
    /// will prevent access to an encoder in the node.
    ///
    /// # Panics
    ///
    /// If the node already declared a renderpass.
    pub fn add_renderpass(&mut self, targets: RenderPassTargets) -> DeclaredDependency<RenderPassHandle> {
        assert!(
            self.rpass.is_none(),
            "Cannot have more than one graph-associated renderpass per node."
        );
        self.rpass = Some(targets);
        DeclaredDependency {
            handle: RenderPassHandle,
        }
    }

    /// Declares that this node has some unknowable side effect, so can't be removed.
    pub fn add_side_effect(&mut self) {
        self.inputs.push(GraphResource::External);
        self.outputs.push(GraphResource::External);
    }

    /// Builds the rendergraph node and adds it into the rendergraph.
    ///
    /// Takes a function that is the body of the node. Nodes will only run if a
    /// following node consumes the output. See module level docs for more
    /// details.
    pub fn build<F>(self, exec: F)
    where
        F: for<'b, 'pass> FnOnce(NodeExecutionContext<'b, 'pass, 'node>) + 'node,
    {
        self.graph.nodes.push(RenderGraphNode {
            label: self.label,
            inputs: self.inputs,
            outputs: self.outputs,
            references: self.references,
            rpass: self.rpass,
            exec: Box::new(exec),
        });
    }
}
