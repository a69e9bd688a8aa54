//! The solar system: bodies, their transforms, and what the player does with them.

mod body;
mod hierarchy;
mod selector;
mod ship;
mod visit;

pub use body::*;
pub use hierarchy::*;
pub use selector::*;
pub use ship::*;
pub use visit::*;
