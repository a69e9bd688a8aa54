//! Holds the sources for all shaders.

use std::borrow::Cow;

use include_dir::{include_dir, Dir};
use wgpu::{Device, ShaderModule, ShaderModuleDescriptor, ShaderSource};

use crate::error::{validated, RoutineError};

/// WGSL sources, one file per routine.
pub static WGSL_SHADERS: Dir = include_dir!("$CARGO_MANIFEST_DIR/shaders/wgsl");

pub fn shader_source(name: &'static str) -> Result<&'static str, RoutineError> {
    WGSL_SHADERS
        .get_file(name)
        .and_then(|file| file.contents_utf8())
        .ok_or(RoutineError::MissingShader(name))
}

/// Compiles an embedded shader, failing if wgpu reports a validation error.
pub fn create_shader_module(device: &Device, name: &'static str) -> Result<ShaderModule, RoutineError> {
    profiling::scope!("create_shader_module", name);

    let source = shader_source(name)?;
    validated(device, name, || {
        device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(Cow::Borrowed(source)),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_routine_shader_is_embedded() {
        for name in [
            "model.wgsl",
            "skybox.wgsl",
            "particle.wgsl",
            "blur.wgsl",
            "composite.wgsl",
        ] {
            assert!(shader_source(name).is_ok(), "{name} missing");
        }
    }

    #[test]
    fn unknown_shader_is_an_error() {
        assert!(matches!(
            shader_source("nope.wgsl"),
            Err(RoutineError::MissingShader("nope.wgsl"))
        ));
    }
}
