//! Textures the frame renders into before the surface.

use glam::UVec2;
use orrery::graph::{
    DeclaredDependency, NodeResourceUsage, RenderGraphNodeBuilder, RenderPassDepthTarget, RenderPassHandle,
    RenderPassTarget, RenderPassTargets, RenderTargetDescriptor, RenderTargetHandle,
};
use wgpu::{
    Color, Device, Extent3d, Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};

use crate::{
    error::{allocated, RoutineError},
    schedule::{BloomSource, BlurTarget},
    state::{HDR_DEPTH_FORMAT, HDR_FORMAT},
};

/// A texture owned outside the render graph, imported into it every frame.
pub struct FrameTarget {
    pub desc: RenderTargetDescriptor,
    /// `None` when the target couldn't be created, the graph then skips every pass using it.
    pub texture: Option<(Texture, TextureView)>,
}

impl FrameTarget {
    fn new(device: &Device, label: &str, resolution: UVec2, format: TextureFormat, usage: TextureUsages) -> Self {
        let desc = RenderTargetDescriptor {
            label: Some(label.into()),
            resolution,
            format,
            usage,
        };

        if desc.validate().is_err() {
            return Self { desc, texture: None };
        }

        let texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width: resolution.x,
                height: resolution.y,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&TextureViewDescriptor::default());

        Self {
            desc,
            texture: Some((texture, view)),
        }
    }

    pub fn view(&self) -> Option<&TextureView> {
        self.texture.as_ref().map(|(_, view)| view)
    }
}

/// The HDR target and the ping-pong blur pair, all at surface resolution.
pub struct FrameTargets {
    pub resolution: UVec2,
    pub hdr_color: FrameTarget,
    pub hdr_bright: FrameTarget,
    pub hdr_depth: FrameTarget,
    pub blur_a: FrameTarget,
    pub blur_b: FrameTarget,
}

impl FrameTargets {
    /// Allocates every target. Zero sized resolutions leave the targets empty
    /// instead of failing, as happens while a window is minimized.
    pub fn new(device: &Device, resolution: UVec2) -> Result<Self, RoutineError> {
        profiling::scope!("FrameTargets::new");
        log::debug!("Allocating frame targets at {resolution}");

        let sampled = TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING;
        allocated(device, "frame targets", || Self {
            resolution,
            hdr_color: FrameTarget::new(device, "hdr color", resolution, HDR_FORMAT, sampled),
            hdr_bright: FrameTarget::new(device, "hdr bright", resolution, HDR_FORMAT, sampled),
            hdr_depth: FrameTarget::new(
                device,
                "hdr depth",
                resolution,
                HDR_DEPTH_FORMAT,
                TextureUsages::RENDER_ATTACHMENT,
            ),
            blur_a: FrameTarget::new(device, "blur a", resolution, HDR_FORMAT, sampled),
            blur_b: FrameTarget::new(device, "blur b", resolution, HDR_FORMAT, sampled),
        })
    }

    pub fn blur(&self, target: BlurTarget) -> &FrameTarget {
        match target {
            BlurTarget::A => &self.blur_a,
            BlurTarget::B => &self.blur_b,
        }
    }

    pub fn bloom(&self, source: BloomSource) -> &FrameTarget {
        match source {
            BloomSource::Bright => &self.hdr_bright,
            BloomSource::BlurA => &self.blur_a,
            BloomSource::BlurB => &self.blur_b,
        }
    }
}

/// The HDR attachments, imported into the graph being built.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HdrTargets {
    pub color: RenderTargetHandle,
    pub bright: RenderTargetHandle,
    pub depth: RenderTargetHandle,
}

impl HdrTargets {
    /// Declares the attachments on `builder` and asks for the renderpass every HDR
    /// pass shares. Identical targets let the graph merge the passes into one.
    pub fn add_renderpass(self, builder: &mut RenderGraphNodeBuilder<'_, '_>) -> DeclaredDependency<RenderPassHandle> {
        let color = builder.add_render_target(self.color, NodeResourceUsage::InputOutput);
        let bright = builder.add_render_target(self.bright, NodeResourceUsage::InputOutput);
        let depth = builder.add_render_target(self.depth, NodeResourceUsage::InputOutput);

        builder.add_renderpass(RenderPassTargets {
            targets: vec![
                RenderPassTarget {
                    color,
                    clear: Color::BLACK,
                },
                RenderPassTarget {
                    color: bright,
                    clear: Color::BLACK,
                },
            ],
            depth_stencil: Some(RenderPassDepthTarget {
                target: depth,
                depth_clear: Some(1.0),
                stencil_clear: Some(0),
            }),
        })
    }
}
