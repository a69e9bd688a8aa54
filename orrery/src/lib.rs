//! Simulation and scheduling core of a small solar system flight demo.
//!
//! The crate is split in two halves that meet at [`FrameSnapshot`]:
//!
//! - The update side: a free-flight [`Camera`], the orbital [`Hierarchy`],
//!   the closest body [`Selector`], [`VisitMode`] and particle [`Emitter`]s,
//!   all driven once per frame by [`World::update`].
//! - The render side: a [`RenderGraph`] that routines add nodes to, plus
//!   device setup through [`create_iad`].
//!
//! Nothing on the render side ever mutates simulation state.

pub mod camera;
pub mod controls;
mod error;
pub mod frame;
pub mod graph;
pub mod mesh;
pub mod particles;
pub mod scene;
mod setup;
pub mod util;
pub mod world;

pub use camera::{Camera, CameraError, CameraPose, CameraSettings, MovementMode};
pub use controls::{CameraControls, FrameInput};
pub use error::*;
pub use frame::{FrameClock, FrameClockSettings};
pub use graph::*;
pub use particles::{Emitter, EmitterSettings};
pub use scene::{Hierarchy, Selector, VisitMode};
pub use setup::*;
pub use world::{FrameSnapshot, World, WorldSettings};

/// Reexport of [`orrery_types`].
pub mod types {
    pub use orrery_types::*;
}
