//! Order of the passes in a frame.
//!
//! The schedule is derived from the frame snapshot alone, before any GPU work
//! is recorded, and is the single source of truth for which passes run and in
//! which order.

use glam::Vec2;
use orrery::{types::BlendMode, world::FrameSnapshot};

use crate::state::PassKind;

/// Image a blur iteration or the composite reads the glow from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BloomSource {
    /// The HDR brightness attachment.
    Bright,
    BlurA,
    BlurB,
}

/// One of the two ping-pong blur targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlurTarget {
    A,
    B,
}

impl BlurTarget {
    pub fn as_source(self) -> BloomSource {
        match self {
            BlurTarget::A => BloomSource::BlurA,
            BlurTarget::B => BloomSource::BlurB,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlurDirection {
    Horizontal,
    Vertical,
}

impl BlurDirection {
    /// Texel step the shader samples along.
    pub fn vector(self) -> Vec2 {
        match self {
            BlurDirection::Horizontal => Vec2::X,
            BlurDirection::Vertical => Vec2::Y,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlurStep {
    pub source: BloomSource,
    pub target: BlurTarget,
    pub direction: BlurDirection,
}

/// Ping-pong blur: the first iteration reads the brightness attachment and writes
/// `A` horizontally, every later one reads what the previous one wrote and writes
/// the other target in the other direction.
pub fn blur_chain(iterations: u32) -> impl Iterator<Item = BlurStep> {
    (0..iterations).map(|i| {
        let even = i % 2 == 0;
        let source = match i {
            0 => BloomSource::Bright,
            _ if even => BloomSource::BlurB,
            _ => BloomSource::BlurA,
        };
        BlurStep {
            source,
            target: if even { BlurTarget::A } else { BlurTarget::B },
            direction: if even {
                BlurDirection::Horizontal
            } else {
                BlurDirection::Vertical
            },
        }
    })
}

/// What the composite reads after `iterations` blur passes.
pub fn final_bloom_source(iterations: u32) -> BloomSource {
    blur_chain(iterations)
        .last()
        .map_or(BloomSource::Bright, |step| step.target.as_source())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScheduledPass {
    Skybox,
    Opaque,
    Instanced,
    LightMarkers,
    Outline,
    /// One batch of [`FrameSnapshot::particles`].
    Particles { batch: usize, blend: BlendMode },
    Blur(BlurStep),
    Composite { bloom: BloomSource },
}

impl ScheduledPass {
    pub fn kind(&self) -> PassKind {
        match *self {
            ScheduledPass::Skybox => PassKind::Skybox,
            ScheduledPass::Opaque => PassKind::Opaque,
            ScheduledPass::Instanced => PassKind::Instanced,
            ScheduledPass::LightMarkers => PassKind::LightMarkers,
            ScheduledPass::Outline => PassKind::Outline,
            ScheduledPass::Particles { blend, .. } => PassKind::Particles(blend),
            ScheduledPass::Blur(_) => PassKind::Blur,
            ScheduledPass::Composite { .. } => PassKind::Composite,
        }
    }
}

/// Builds the fixed pass order for one frame.
///
/// Skybox, opaque bodies and the composite always run. The belt, light markers,
/// outline and particle batches only run when the snapshot has something for
/// them to draw.
pub fn frame_schedule(snapshot: &FrameSnapshot, blur_iterations: u32) -> Vec<ScheduledPass> {
    profiling::scope!("frame_schedule");

    let mut passes = Vec::with_capacity(8 + snapshot.particles.len() + blur_iterations as usize);

    passes.push(ScheduledPass::Skybox);
    passes.push(ScheduledPass::Opaque);
    if snapshot.belt.is_some() {
        passes.push(ScheduledPass::Instanced);
    }
    if snapshot.lights.iter().any(|light| light.marker) {
        passes.push(ScheduledPass::LightMarkers);
    }
    if snapshot.highlighted.is_some() {
        passes.push(ScheduledPass::Outline);
    }
    for (batch, particles) in snapshot.particles.iter().enumerate() {
        if !particles.instances.is_empty() {
            passes.push(ScheduledPass::Particles {
                batch,
                blend: particles.blend,
            });
        }
    }
    passes.extend(blur_chain(blur_iterations).map(ScheduledPass::Blur));
    passes.push(ScheduledPass::Composite {
        bloom: final_bloom_source(blur_iterations),
    });

    passes
}
