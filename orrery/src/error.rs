use thiserror::Error;
use wgpu::Features;

/// Enum mapping to each of a device's limits that the renderer checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LimitType {
    BindGroups,
    DynamicUniformBuffersPerPipelineLayout,
    SampledTexturesPerShaderStages,
    SamplersPerShaderStages,
    UniformBuffersPerShaderStages,
    UniformBufferBindingSize,
    MaxTextureDimension2d,
    MaxVertexBuffers,
    MaxVertexAttributes,
    MaxVertexBufferArrayStride,
    ColorAttachments,
}

/// Reason why the renderer failed to initialize.
#[derive(Error, Debug)]
pub enum RendererInitializationError {
    #[error("No supported adapter found")]
    MissingAdapter,
    #[error("The device limit of {:?} is {} but renderer requires at least {}", ty, device_limit, required_limit)]
    LowDeviceLimit {
        ty: LimitType,
        device_limit: u64,
        required_limit: u64,
    },
    #[error("Device is missing required features: {:?}", features)]
    MissingDeviceFeatures { features: Features },
    #[error("Requesting a device failed")]
    RequestDeviceFailed(#[source] wgpu::RequestDeviceError),
    #[error("Failed to create the window surface")]
    SurfaceCreation(#[source] wgpu::CreateSurfaceError),
    #[error("Surface is not supported by the chosen adapter")]
    UnsupportedSurface,
}
