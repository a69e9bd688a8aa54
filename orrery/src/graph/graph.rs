use std::marker::PhantomData;

use wgpu::{
    CommandEncoderDescriptor, Device, LoadOp, Operations, Queue, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, StoreOp, TextureView,
};

use crate::{
    graph::{
        GraphError, GraphResource, NodeExecutionContext, Recorder, RenderGraphEncoderOrPass, RenderGraphNode,
        RenderGraphNodeBuilder, RenderPassTargets, RenderTargetDescriptor, RenderTargetHandle,
    },
    util::typedefs::{FastHashSet, SsoString},
};

pub(super) struct ImportedTarget<'node> {
    pub desc: RenderTargetDescriptor,
    pub view: Option<&'node TextureView>,
    /// Consumed after the graph finishes, like the surface.
    pub output: bool,
}

/// A run of nodes recorded back to back, sharing a renderpass if they asked for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPass {
    /// Indices of the nodes, in the order they were added.
    pub nodes: Vec<usize>,
    pub renderpass: bool,
    /// Attachments this pass is the first to touch. They get cleared, everything else is loaded.
    pub clears: Vec<RenderTargetHandle>,
}

/// The result of planning a graph. See the module docs for the rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphPlan {
    pub passes: Vec<PlannedPass>,
    /// Nodes dropped because they use an invalid render target.
    pub invalid: Vec<usize>,
    /// Nodes dropped because nothing consumes what they produce.
    pub pruned: Vec<usize>,
}

impl GraphPlan {
    /// Every node that will run, in order.
    pub fn node_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.passes.iter().flat_map(|p| p.nodes.iter().copied())
    }
}

/// Implementation of a rendergraph. See module docs for details.
pub struct RenderGraph<'node> {
    pub(super) targets: Vec<ImportedTarget<'node>>,
    pub(super) nodes: Vec<RenderGraphNode<'node>>,
}
impl<'node> RenderGraph<'node> {
    pub fn new() -> Self {
        Self {
            targets: Vec::with_capacity(16),
            nodes: Vec::with_capacity(32),
        }
    }

    pub fn add_node<'a, S>(&'a mut self, label: S) -> RenderGraphNodeBuilder<'a, 'node>
    where
        SsoString: From<S>,
    {
        RenderGraphNodeBuilder {
            label: SsoString::from(label),
            graph: self,
            inputs: Vec::with_capacity(16),
            outputs: Vec::with_capacity(16),
            references: Vec::with_capacity(16),
            rpass: None,
        }
    }

    /// Imports a target that lives outside the graph. Nodes writing it are only kept if a
    /// later node reads it.
    pub fn add_render_target(
        &mut self,
        desc: RenderTargetDescriptor,
        view: Option<&'node TextureView>,
    ) -> RenderTargetHandle {
        self.import(desc, view, false)
    }

    /// Imports a target that is consumed once the graph is done, such as the surface.
    pub fn add_output_target(
        &mut self,
        desc: RenderTargetDescriptor,
        view: Option<&'node TextureView>,
    ) -> RenderTargetHandle {
        self.import(desc, view, true)
    }

    fn import(
        &mut self,
        desc: RenderTargetDescriptor,
        view: Option<&'node TextureView>,
        output: bool,
    ) -> RenderTargetHandle {
        let idx = self.targets.len();
        self.targets.push(ImportedTarget { desc, view, output });
        RenderTargetHandle { idx }
    }

    pub fn target_descriptor(&self, handle: RenderTargetHandle) -> &RenderTargetDescriptor {
        &self.targets[handle.idx].desc
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_label(&self, idx: usize) -> Option<&str> {
        self.nodes.get(idx).map(|n| n.label.as_str())
    }

    /// Decides which nodes run, how they group into renderpasses, and which attachments
    /// get cleared. Does not look at target views.
    pub fn plan(&self) -> GraphPlan {
        profiling::scope!("RenderGraph::plan");

        let mut plan = GraphPlan::default();

        let mut invalid_targets = FastHashSet::default();
        for (idx, target) in self.targets.iter().enumerate() {
            if let Err(e) = target.desc.validate() {
                log::error!("{e}");
                invalid_targets.insert(GraphResource::Texture(idx));
            }
        }

        let mut valid_nodes = Vec::with_capacity(self.nodes.len());
        {
            profiling::scope!("Invalid Target Elimination");
            for (idx, node) in self.nodes.iter().enumerate() {
                let mut touched = node
                    .inputs
                    .iter()
                    .chain(&node.outputs)
                    .chain(&node.references)
                    .copied()
                    .chain(node.rpass.iter().flat_map(|r| r.handles().map(RenderTargetHandle::resource)));

                if touched.any(|r| invalid_targets.contains(&r)) {
                    log::error!("Skipping node {:?}, it uses an invalid render target", node.label);
                    plan.invalid.push(idx);
                } else {
                    valid_nodes.push(idx);
                }
            }
        }

        let mut awaiting_inputs = FastHashSet::default();
        // Output targets are always used
        for (idx, target) in self.targets.iter().enumerate() {
            if target.output {
                awaiting_inputs.insert(GraphResource::Texture(idx));
            }
        }
        // External deps are used externally
        awaiting_inputs.insert(GraphResource::External);

        let mut kept = Vec::with_capacity(valid_nodes.len());
        {
            profiling::scope!("Dead Node Elimination");
            // Iterate the nodes backwards to track dependencies
            for &idx in valid_nodes.iter().rev() {
                let node = &self.nodes[idx];
                // If any of our outputs are used by a later node, we have reason to exist
                let mut outputs_used = false;
                for output in &node.outputs {
                    outputs_used |= awaiting_inputs.remove(output);
                }

                if outputs_used {
                    awaiting_inputs.extend(node.inputs.iter().copied());
                    kept.push(idx);
                } else {
                    log::trace!("Pruning node {:?}, nothing consumes its outputs", node.label);
                    plan.pruned.push(idx);
                }
            }
            kept.reverse();
            plan.pruned.reverse();
        }

        {
            profiling::scope!("Renderpass Description");
            let mut previous: Option<usize> = None;
            let mut touched = FastHashSet::default();
            for idx in kept {
                let node = &self.nodes[idx];
                let compatible = previous.map_or(false, |prev| {
                    RenderPassTargets::compatible(self.nodes[prev].rpass.as_ref(), node.rpass.as_ref())
                });

                match (compatible, plan.passes.last_mut()) {
                    (true, Some(pass)) => pass.nodes.push(idx),
                    _ => {
                        let clears = node
                            .rpass
                            .iter()
                            .flat_map(RenderPassTargets::handles)
                            .filter(|handle| !touched.contains(handle))
                            .collect();
                        plan.passes.push(PlannedPass {
                            nodes: vec![idx],
                            renderpass: node.rpass.is_some(),
                            clears,
                        });
                    }
                }

                if let Some(ref rpass) = node.rpass {
                    touched.extend(rpass.handles());
                }
                touched.extend(node.outputs.iter().filter_map(|o| match *o {
                    GraphResource::Texture(idx) => Some(RenderTargetHandle { idx }),
                    GraphResource::External => None,
                }));
                previous = Some(idx);
            }
        }

        plan
    }

    /// Plans the graph, records every surviving node, and submits the work.
    pub fn execute(self, device: &Device, queue: &Queue) -> GraphPlan {
        profiling::scope!("RenderGraph::execute");

        let plan = self.plan();

        let RenderGraph { targets, nodes } = self;
        let mut nodes: Vec<Option<RenderGraphNode<'node>>> = nodes.into_iter().map(Some).collect();

        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("render graph encoder"),
        });

        profiling::scope!("Run Nodes");

        for pass in &plan.passes {
            let mut pass_nodes = pass.nodes.iter().filter_map(|&idx| nodes[idx].take());

            if !pass.renderpass {
                for node in pass_nodes {
                    profiling::scope!("Execute Node", node.label.as_str());
                    (node.exec)(NodeExecutionContext {
                        device,
                        queue,
                        encoder_or_pass: RenderGraphEncoderOrPass(Recorder::Encoder(&mut encoder)),
                        _phantom: PhantomData,
                    });
                }
                continue;
            }

            let Some(first) = pass_nodes.next() else {
                continue;
            };
            let Some(ref desc) = first.rpass else {
                continue;
            };

            let (color_attachments, depth_stencil_attachment) = match create_attachments(&targets, desc, &pass.clears) {
                Ok(attachments) => attachments,
                Err(e) => {
                    log::error!("Skipping renderpass starting at node {:?}: {e}", first.label);
                    continue;
                }
            };

            let label = first.label.clone();
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some(label.as_str()),
                color_attachments: &color_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for node in std::iter::once(first).chain(pass_nodes) {
                profiling::scope!("Execute Node", node.label.as_str());
                (node.exec)(NodeExecutionContext {
                    device,
                    queue,
                    encoder_or_pass: RenderGraphEncoderOrPass(Recorder::RenderPass(&mut rpass)),
                    _phantom: PhantomData,
                });
            }
        }

        queue.submit(Some(encoder.finish()));

        plan
    }
}

type Attachments<'node> = (
    Vec<Option<RenderPassColorAttachment<'node>>>,
    Option<RenderPassDepthStencilAttachment<'node>>,
);

fn target_view<'node>(
    targets: &[ImportedTarget<'node>],
    handle: RenderTargetHandle,
) -> Result<&'node TextureView, GraphError> {
    let target = &targets[handle.idx];
    target.view.ok_or_else(|| GraphError::MissingView {
        label: target.desc.label.clone(),
    })
}

fn create_attachments<'node>(
    targets: &[ImportedTarget<'node>],
    desc: &RenderPassTargets,
    clears: &[RenderTargetHandle],
) -> Result<Attachments<'node>, GraphError> {
    let mut color_attachments = Vec::with_capacity(desc.targets.len());
    for target in &desc.targets {
        let handle = target.color.handle;
        let load = if clears.contains(&handle) {
            LoadOp::Clear(target.clear)
        } else {
            LoadOp::Load
        };
        color_attachments.push(Some(RenderPassColorAttachment {
            view: target_view(targets, handle)?,
            resolve_target: None,
            ops: Operations {
                load,
                store: StoreOp::Store,
            },
        }));
    }

    let depth_stencil_attachment = match desc.depth_stencil {
        Some(ref ds_target) => {
            let handle = ds_target.target.handle;
            let first_use = clears.contains(&handle);

            let depth_ops = ds_target.depth_clear.map(|clear| Operations {
                load: if first_use { LoadOp::Clear(clear) } else { LoadOp::Load },
                store: StoreOp::Store,
            });
            let stencil_ops = ds_target.stencil_clear.map(|clear| Operations {
                load: if first_use { LoadOp::Clear(clear) } else { LoadOp::Load },
                store: StoreOp::Store,
            });

            Some(RenderPassDepthStencilAttachment {
                view: target_view(targets, handle)?,
                depth_ops,
                stencil_ops,
            })
        }
        None => None,
    };

    Ok((color_attachments, depth_stencil_attachment))
}

impl<'node> Default for RenderGraph<'node> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use glam::UVec2;
    use orrery_types::{TextureFormat, TextureUsages};
    use wgpu::Color;

    use super::*;
    use crate::graph::{NodeResourceUsage, RenderPassDepthTarget, RenderPassTarget};

    fn desc(label: &str, resolution: UVec2) -> RenderTargetDescriptor {
        RenderTargetDescriptor {
            label: Some(SsoString::from(label)),
            resolution,
            format: TextureFormat::Rgba16Float,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
        }
    }

    fn color_pass(
        builder: &mut RenderGraphNodeBuilder<'_, '_>,
        target: RenderTargetHandle,
        usage: NodeResourceUsage,
    ) {
        let color = builder.add_render_target(target, usage);
        builder.add_renderpass(RenderPassTargets {
            targets: vec![RenderPassTarget {
                color,
                clear: Color::BLACK,
            }],
            depth_stencil: None,
        });
    }

    #[test]
    fn unused_nodes_are_pruned() {
        let size = UVec2::new(64, 64);
        let mut graph = RenderGraph::new();
        let scratch = graph.add_render_target(desc("scratch", size), None);
        let surface = graph.add_output_target(desc("surface", size), None);

        let mut builder = graph.add_node("unused");
        color_pass(&mut builder, scratch, NodeResourceUsage::Output);
        builder.build(|_| {});

        let mut builder = graph.add_node("present");
        color_pass(&mut builder, surface, NodeResourceUsage::Output);
        builder.build(|_| {});

        let plan = graph.plan();
        assert_eq!(plan.node_order().collect::<Vec<_>>(), vec![1]);
        assert_eq!(plan.pruned, vec![0]);
        assert!(plan.invalid.is_empty());
    }

    #[test]
    fn compatible_nodes_share_a_renderpass() {
        let size = UVec2::new(64, 64);
        let mut graph = RenderGraph::new();
        let hdr = graph.add_render_target(desc("hdr", size), None);
        let depth = graph.add_render_target(desc("depth", size), None);
        let surface = graph.add_output_target(desc("surface", size), None);

        for (label, usage) in [
            ("skybox", NodeResourceUsage::Output),
            ("opaque", NodeResourceUsage::InputOutput),
            ("outline", NodeResourceUsage::InputOutput),
        ] {
            let mut builder = graph.add_node(label);
            let color = builder.add_render_target(hdr, usage);
            let depth = builder.add_render_target(depth, usage);
            builder.add_renderpass(RenderPassTargets {
                targets: vec![RenderPassTarget {
                    color,
                    clear: Color::BLACK,
                }],
                depth_stencil: Some(RenderPassDepthTarget {
                    target: depth,
                    depth_clear: Some(1.0),
                    stencil_clear: Some(0),
                }),
            });
            builder.build(|_| {});
        }

        let mut builder = graph.add_node("composite");
        builder.add_render_target(hdr, NodeResourceUsage::Input);
        color_pass(&mut builder, surface, NodeResourceUsage::Output);
        builder.build(|_| {});

        let plan = graph.plan();
        assert_eq!(plan.passes.len(), 2);
        assert_eq!(plan.passes[0].nodes, vec![0, 1, 2]);
        assert_eq!(plan.passes[0].clears, vec![hdr, depth]);
        assert_eq!(plan.passes[1].nodes, vec![3]);
        assert_eq!(plan.passes[1].clears, vec![surface]);
    }

    #[test]
    fn later_passes_load() {
        let size = UVec2::new(64, 64);
        let mut graph = RenderGraph::new();
        let a = graph.add_render_target(desc("a", size), None);
        let b = graph.add_render_target(desc("b", size), None);
        let surface = graph.add_output_target(desc("surface", size), None);

        // a -> b -> a -> b -> surface, the way a blur ping-pongs.
        let chain = [(None, a), (Some(a), b), (Some(b), a), (Some(a), b)];
        for (i, (read, write)) in chain.into_iter().enumerate() {
            let mut builder = graph.add_node(format!("step {i}"));
            builder.add_optional_render_target(read, NodeResourceUsage::Input);
            color_pass(&mut builder, write, NodeResourceUsage::Output);
            builder.build(|_| {});
        }
        let mut builder = graph.add_node("composite");
        builder.add_render_target(b, NodeResourceUsage::Input);
        color_pass(&mut builder, surface, NodeResourceUsage::Output);
        builder.build(|_| {});

        let plan = graph.plan();
        assert_eq!(plan.node_order().count(), 5);
        assert_eq!(plan.passes[0].clears, vec![a]);
        assert_eq!(plan.passes[1].clears, vec![b]);
        assert!(plan.passes[2].clears.is_empty());
        assert!(plan.passes[3].clears.is_empty());
    }

    #[test]
    fn invalid_targets_drop_their_nodes() {
        let mut graph = RenderGraph::new();
        let broken = graph.add_render_target(desc("broken", UVec2::new(0, 16)), None);
        let surface = graph.add_output_target(desc("surface", UVec2::new(16, 16)), None);

        let mut builder = graph.add_node("writes broken");
        color_pass(&mut builder, broken, NodeResourceUsage::Output);
        builder.build(|_| {});

        let mut builder = graph.add_node("clear surface");
        color_pass(&mut builder, surface, NodeResourceUsage::Output);
        builder.build(|_| {});

        let mut builder = graph.add_node("reads broken");
        builder.add_render_target(broken, NodeResourceUsage::Input);
        color_pass(&mut builder, surface, NodeResourceUsage::InputOutput);
        builder.build(|_| {});

        let plan = graph.plan();
        assert_eq!(plan.invalid, vec![0, 2]);
        assert_eq!(plan.node_order().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn side_effects_are_kept() {
        let mut graph = RenderGraph::new();
        let mut builder = graph.add_node("upload");
        builder.add_side_effect();
        builder.build(|_| {});

        let plan = graph.plan();
        assert_eq!(plan.passes.len(), 1);
        assert!(!plan.passes[0].renderpass);
    }

    #[test]
    fn descriptor_validation() {
        assert!(desc("ok", UVec2::new(1, 1)).validate().is_ok());
        assert!(matches!(
            desc("zero", UVec2::new(4, 0)).validate(),
            Err(GraphError::ZeroExtent { .. })
        ));
        let sampled_only = RenderTargetDescriptor {
            usage: TextureUsages::TEXTURE_BINDING,
            ..desc("sampled", UVec2::new(4, 4))
        };
        assert!(matches!(
            sampled_only.validate(),
            Err(GraphError::NotRenderable { .. })
        ));
    }
}
