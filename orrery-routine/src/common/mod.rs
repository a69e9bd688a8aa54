//! Common utilities used throughout the crate.

mod bindings;
mod interfaces;
mod pipeline;
mod samplers;

pub use bindings::*;
pub use interfaces::*;
pub use pipeline::*;
pub use samplers::*;
