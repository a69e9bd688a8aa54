//! Render routines for the orrery renderer.
//!
//! Each routine owns the pipelines for one kind of pass and knows how to add
//! itself to a [`RenderGraph`](orrery::graph::RenderGraph).
//! [`BaseRenderGraph`](base::BaseRenderGraph) ties them together in the order
//! decided by [`schedule::frame_schedule`]:
//!
//! 1. skybox
//! 2. opaque bodies and the ship, stamping the highlighted body into the stencil
//! 3. the instanced asteroid belt
//! 4. light markers
//! 5. the outline of the highlighted body
//! 6. particles, one pass per emitter
//! 7. ping-pong blur of the brightness attachment
//! 8. tone mapped composite into the surface

pub mod base;
pub mod bloom;
pub mod common;
pub mod composite;
mod error;
pub mod forward;
pub mod outline;
pub mod particles;
pub mod scene;
pub mod schedule;
pub mod shaders;
pub mod skybox;
pub mod state;
pub mod targets;
pub mod uniforms;
pub mod upload;

pub use base::{BaseRenderGraph, RenderSettings};
pub use bloom::BloomSettings;
pub use error::RoutineError;
pub use scene::SceneAssets;
