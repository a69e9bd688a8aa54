//! Helpers shared by the renderer and its routines.

pub mod bind_merge;
pub mod error_scope;
pub mod typedefs;
