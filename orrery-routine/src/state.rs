//! Depth, stencil and blend state of every pass.
//!
//! All passes that render into the HDR target share its depth-stencil
//! attachment, so they all declare [`HDR_DEPTH_FORMAT`] even when they don't
//! test or write depth.

use orrery::types::BlendMode;
use wgpu::{
    BlendComponent, BlendFactor, BlendOperation, BlendState, ColorWrites, CompareFunction, DepthBiasState,
    DepthStencilState, StencilFaceState, StencilOperation, StencilState, TextureFormat,
};

/// Format of both HDR color attachments.
pub const HDR_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
/// Format of the HDR depth-stencil attachment.
pub const HDR_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;
/// Stencil value opaque geometry writes under the highlighted body.
pub const STENCIL_HIGHLIGHT: u32 = 1;

/// Every kind of pass the frame is made of.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PassKind {
    Skybox,
    Opaque,
    Instanced,
    LightMarkers,
    Outline,
    Particles(BlendMode),
    Blur,
    Composite,
}

const ADDITIVE: BlendState = BlendState {
    color: BlendComponent {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
    alpha: BlendComponent {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
};

impl PassKind {
    /// Whether this pass renders into the HDR target.
    pub fn uses_hdr_target(self) -> bool {
        !matches!(self, PassKind::Blur | PassKind::Composite)
    }

    /// Depth-stencil state for the pipeline, `None` for passes without a depth attachment.
    pub fn depth_stencil(self) -> Option<DepthStencilState> {
        let (depth_compare, depth_write_enabled) = match self {
            PassKind::Skybox | PassKind::Outline => (CompareFunction::Always, false),
            PassKind::Opaque | PassKind::Instanced | PassKind::LightMarkers => (CompareFunction::Less, true),
            PassKind::Particles(_) => (CompareFunction::Less, false),
            PassKind::Blur | PassKind::Composite => return None,
        };

        Some(DepthStencilState {
            format: HDR_DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: self.stencil(),
            bias: DepthBiasState::default(),
        })
    }

    fn stencil(self) -> StencilState {
        let face = match self {
            // Every fragment records whether it belongs to the highlighted body.
            PassKind::Opaque => StencilFaceState {
                compare: CompareFunction::Always,
                fail_op: StencilOperation::Keep,
                depth_fail_op: StencilOperation::Keep,
                pass_op: StencilOperation::Replace,
            },
            // Only draw where the highlighted body isn't.
            PassKind::Outline => StencilFaceState {
                compare: CompareFunction::NotEqual,
                fail_op: StencilOperation::Keep,
                depth_fail_op: StencilOperation::Keep,
                pass_op: StencilOperation::Keep,
            },
            _ => return StencilState::default(),
        };

        StencilState {
            front: face,
            back: face,
            read_mask: 0xFF,
            write_mask: if self == PassKind::Opaque { 0xFF } else { 0x00 },
        }
    }

    pub fn blend(self) -> Option<BlendState> {
        match self {
            PassKind::Particles(BlendMode::Additive) => Some(ADDITIVE),
            PassKind::Particles(BlendMode::Alpha) => Some(BlendState::ALPHA_BLENDING),
            _ => None,
        }
    }

    /// The outline must not bloom, so it leaves the brightness attachment alone.
    pub fn bright_write_mask(self) -> ColorWrites {
        match self {
            PassKind::Outline => ColorWrites::empty(),
            _ => ColorWrites::ALL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_table() {
        let table = [
            (PassKind::Skybox, CompareFunction::Always, false),
            (PassKind::Opaque, CompareFunction::Less, true),
            (PassKind::Instanced, CompareFunction::Less, true),
            (PassKind::LightMarkers, CompareFunction::Less, true),
            (PassKind::Outline, CompareFunction::Always, false),
            (PassKind::Particles(BlendMode::Additive), CompareFunction::Less, false),
            (PassKind::Particles(BlendMode::Alpha), CompareFunction::Less, false),
        ];

        for (kind, compare, write) in table {
            let state = kind.depth_stencil().unwrap();
            assert_eq!(state.format, HDR_DEPTH_FORMAT, "{kind:?}");
            assert_eq!(state.depth_compare, compare, "{kind:?}");
            assert_eq!(state.depth_write_enabled, write, "{kind:?}");
        }

        assert!(PassKind::Blur.depth_stencil().is_none());
        assert!(PassKind::Composite.depth_stencil().is_none());
    }

    #[test]
    fn stencil_table() {
        let opaque = PassKind::Opaque.depth_stencil().unwrap().stencil;
        assert_eq!(opaque.front.compare, CompareFunction::Always);
        assert_eq!(opaque.front.pass_op, StencilOperation::Replace);
        assert_eq!(opaque.write_mask, 0xFF);

        let outline = PassKind::Outline.depth_stencil().unwrap().stencil;
        assert_eq!(outline.front.compare, CompareFunction::NotEqual);
        assert_eq!(outline.front.pass_op, StencilOperation::Keep);
        assert_eq!(outline.write_mask, 0);

        for kind in [
            PassKind::Skybox,
            PassKind::Instanced,
            PassKind::LightMarkers,
            PassKind::Particles(BlendMode::Alpha),
        ] {
            assert!(!kind.depth_stencil().unwrap().stencil.is_enabled(), "{kind:?}");
        }
    }

    #[test]
    fn only_particles_blend() {
        assert_eq!(PassKind::Particles(BlendMode::Additive).blend(), Some(ADDITIVE));
        assert_eq!(
            PassKind::Particles(BlendMode::Alpha).blend(),
            Some(BlendState::ALPHA_BLENDING)
        );
        for kind in [
            PassKind::Skybox,
            PassKind::Opaque,
            PassKind::Instanced,
            PassKind::LightMarkers,
            PassKind::Outline,
            PassKind::Blur,
            PassKind::Composite,
        ] {
            assert_eq!(kind.blend(), None, "{kind:?}");
        }
    }

    #[test]
    fn outline_does_not_bloom() {
        assert_eq!(PassKind::Outline.bright_write_mask(), ColorWrites::empty());
        assert_eq!(PassKind::Opaque.bright_write_mask(), ColorWrites::ALL);
        assert!(PassKind::Outline.uses_hdr_target());
        assert!(!PassKind::Blur.uses_hdr_target());
    }
}
