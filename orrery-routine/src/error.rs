use orrery::{
    types::MeshValidationError,
    util::error_scope::{AllocationErrorScope, ValidationErrorScope},
};
use thiserror::Error;
use wgpu::Device;

/// Everything that can go wrong while building the render routines.
///
/// wgpu errors are kept as their rendered message since they are not `Sync`.
#[derive(Debug, Error)]
pub enum RoutineError {
    #[error("Shader {0:?} is not embedded or is not valid UTF-8")]
    MissingShader(&'static str),
    #[error("Failed to build {label}: {message}")]
    Shader { label: &'static str, message: String },
    #[error("Failed to allocate {label}: {message}")]
    Allocation { label: &'static str, message: String },
    #[error("Mesh {label:?} is invalid")]
    InvalidMesh {
        label: &'static str,
        #[source]
        source: MeshValidationError,
    },
    #[error("Texture {label:?} has {actual} bytes of data, expected {expected}")]
    TextureDataSize {
        label: Option<String>,
        expected: usize,
        actual: usize,
    },
}

/// Runs `f` inside a validation error scope, turning any error into [`RoutineError::Shader`].
pub(crate) fn validated<T>(device: &Device, label: &'static str, f: impl FnOnce() -> T) -> Result<T, RoutineError> {
    let scope = ValidationErrorScope::new(device);
    let value = f();
    scope
        .end()
        .map_err(|e| RoutineError::Shader {
            label,
            message: e.to_string(),
        })?;
    Ok(value)
}

/// Runs `f` inside an out of memory error scope, turning any error into [`RoutineError::Allocation`].
pub(crate) fn allocated<T>(device: &Device, label: &'static str, f: impl FnOnce() -> T) -> Result<T, RoutineError> {
    let scope = AllocationErrorScope::new(device);
    let value = f();
    scope
        .end()
        .map_err(|e| RoutineError::Allocation {
            label,
            message: e.to_string(),
        })?;
    Ok(value)
}
