use std::sync::Arc;

use smallvec::SmallVec;
use wgpu::{
    Adapter, AdapterInfo, Backend, Backends, Device, DeviceDescriptor, DeviceType, Features, Instance,
    InstanceDescriptor, Limits, Queue,
};

use crate::{
    error::{LimitType, RendererInitializationError},
    util::typedefs::FastHashMap,
};

/// Largest uniform buffer binding the routines bind.
pub const MAX_UNIFORM_BUFFER_BINDING_SIZE: u64 = 1024;

/// Nothing beyond what every backend offers is needed.
pub const REQUIRED_FEATURES: Features = Features::empty();

/// Features used when present.
pub const OPTIONAL_FEATURES: Features = Features::from_bits_truncate(Features::TIMESTAMP_QUERY.bits());

/// Check that all required features are present in the feature set given.
pub fn check_features(device: Features) -> Result<Features, RendererInitializationError> {
    let optional = OPTIONAL_FEATURES & device;
    let missing = REQUIRED_FEATURES - device;
    if !missing.is_empty() {
        Err(RendererInitializationError::MissingDeviceFeatures { features: missing })
    } else {
        Ok(REQUIRED_FEATURES | optional)
    }
}

/// Limits required to draw the scene: three bind groups, one dynamic offset uniform for
/// per object data, and two render targets written at once.
pub fn required_limits() -> Limits {
    Limits {
        max_texture_dimension_2d: 2048,
        max_bind_groups: 3,
        max_dynamic_uniform_buffers_per_pipeline_layout: 1,
        max_sampled_textures_per_shader_stage: 4,
        max_samplers_per_shader_stage: 2,
        max_uniform_buffers_per_shader_stage: 3,
        max_uniform_buffer_binding_size: MAX_UNIFORM_BUFFER_BINDING_SIZE as u32,
        max_vertex_buffers: 2,
        max_vertex_attributes: 8,
        max_vertex_buffer_array_stride: 128,
        max_color_attachments: 2,
        ..Limits::downlevel_webgl2_defaults()
    }
}

fn check_limit_unlimited(d: u32, r: u32, ty: LimitType) -> Result<u32, RendererInitializationError> {
    if d < r {
        Err(RendererInitializationError::LowDeviceLimit {
            ty,
            device_limit: d as _,
            required_limit: r as _,
        })
    } else {
        Ok(d)
    }
}

/// Check that all required limits are present in the given limit set.
///
/// Checked limits take the device's value so nothing the device offers is left unused.
pub fn check_limits(device_limits: &Limits) -> Result<Limits, RendererInitializationError> {
    let required = required_limits();

    Ok(Limits {
        max_texture_dimension_2d: check_limit_unlimited(
            device_limits.max_texture_dimension_2d,
            required.max_texture_dimension_2d,
            LimitType::MaxTextureDimension2d,
        )?,
        max_bind_groups: check_limit_unlimited(
            device_limits.max_bind_groups,
            required.max_bind_groups,
            LimitType::BindGroups,
        )?,
        max_dynamic_uniform_buffers_per_pipeline_layout: check_limit_unlimited(
            device_limits.max_dynamic_uniform_buffers_per_pipeline_layout,
            required.max_dynamic_uniform_buffers_per_pipeline_layout,
            LimitType::DynamicUniformBuffersPerPipelineLayout,
        )?,
        max_sampled_textures_per_shader_stage: check_limit_unlimited(
            device_limits.max_sampled_textures_per_shader_stage,
            required.max_sampled_textures_per_shader_stage,
            LimitType::SampledTexturesPerShaderStages,
        )?,
        max_samplers_per_shader_stage: check_limit_unlimited(
            device_limits.max_samplers_per_shader_stage,
            required.max_samplers_per_shader_stage,
            LimitType::SamplersPerShaderStages,
        )?,
        max_uniform_buffers_per_shader_stage: check_limit_unlimited(
            device_limits.max_uniform_buffers_per_shader_stage,
            required.max_uniform_buffers_per_shader_stage,
            LimitType::UniformBuffersPerShaderStages,
        )?,
        max_uniform_buffer_binding_size: check_limit_unlimited(
            device_limits.max_uniform_buffer_binding_size,
            required.max_uniform_buffer_binding_size,
            LimitType::UniformBufferBindingSize,
        )?,
        max_vertex_buffers: check_limit_unlimited(
            device_limits.max_vertex_buffers,
            required.max_vertex_buffers,
            LimitType::MaxVertexBuffers,
        )?,
        max_vertex_attributes: check_limit_unlimited(
            device_limits.max_vertex_attributes,
            required.max_vertex_attributes,
            LimitType::MaxVertexAttributes,
        )?,
        max_vertex_buffer_array_stride: check_limit_unlimited(
            device_limits.max_vertex_buffer_array_stride,
            required.max_vertex_buffer_array_stride,
            LimitType::MaxVertexBufferArrayStride,
        )?,
        max_color_attachments: check_limit_unlimited(
            device_limits.max_color_attachments,
            required.max_color_attachments,
            LimitType::ColorAttachments,
        )?,
        ..device_limits.clone()
    })
}

/// Validated set of features and limits for a given T.
pub struct PotentialAdapter<T> {
    pub inner: T,
    pub info: AdapterInfo,
    pub features: Features,
    pub limits: Limits,
}
impl<T> PotentialAdapter<T> {
    pub fn new(
        inner: T,
        info: AdapterInfo,
        inner_limits: Limits,
        inner_features: Features,
    ) -> Result<Self, RendererInitializationError> {
        Ok(PotentialAdapter {
            inner,
            info,
            features: check_features(inner_features)?,
            limits: check_limits(&inner_limits)?,
        })
    }
}

/// Container for Instance/Adapter/Device/Queue.
///
/// Create these yourself, or call [`create_iad`].
pub struct InstanceAdapterDevice {
    pub instance: Arc<Instance>,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    pub info: AdapterInfo,
}

fn device_type_rank(ty: DeviceType) -> u8 {
    match ty {
        DeviceType::DiscreteGpu => 0,
        DeviceType::IntegratedGpu => 1,
        DeviceType::VirtualGpu => 2,
        DeviceType::Cpu => 3,
        DeviceType::Other => 4,
    }
}

/// Creates an Instance/Adapter/Device/Queue using the given choices. Tries to get the best combination.
pub async fn create_iad(
    desired_backend: Option<Backend>,
    desired_device: Option<String>,
) -> Result<InstanceAdapterDevice, RendererInitializationError> {
    profiling::scope!("create_iad");

    let backend_bits = Backends::VULKAN | Backends::DX12 | Backends::METAL | Backends::GL;
    let default_backend_order = [Backend::Vulkan, Backend::Metal, Backend::Dx12, Backend::Gl];

    let instance = Instance::new(InstanceDescriptor {
        backends: backend_bits,
        ..InstanceDescriptor::default()
    });

    let mut valid_adapters = FastHashMap::default();

    for backend in &default_backend_order {
        let adapters = instance.enumerate_adapters(Backends::from(*backend));

        let mut potential_adapters = SmallVec::<[PotentialAdapter<Adapter>; 4]>::new();
        for (idx, adapter) in adapters.into_iter().enumerate() {
            let info = adapter.get_info();
            let limits = adapter.limits();
            let features = adapter.features();
            let potential = PotentialAdapter::new(adapter, info, limits, features);

            log::debug!(
                "{:?} Adapter {}: {:#?}",
                backend,
                idx,
                potential.as_ref().map(|p| &p.info)
            );

            let desired = if let Some(ref desired_device) = desired_device {
                potential
                    .as_ref()
                    .map(|i| i.info.name.to_lowercase().contains(&desired_device.to_lowercase()))
                    .unwrap_or(false)
            } else {
                true
            };

            match (potential, desired) {
                (Ok(potential), true) => potential_adapters.push(potential),
                (Err(e), _) => log::debug!("Adapter not usable: {e}"),
                (Ok(_), false) => log::debug!("Adapter not desired"),
            }
        }
        valid_adapters.insert(*backend, potential_adapters);
    }

    for backend_adapters in valid_adapters.values_mut() {
        backend_adapters.sort_by_key(|a| device_type_rank(a.info.device_type));
    }

    for backend in &default_backend_order {
        if let Some(desired_backend) = desired_backend {
            if desired_backend != *backend {
                log::debug!("Skipping unwanted backend {:?}", backend);
                continue;
            }
        }

        let adapter = valid_adapters.remove(backend).and_then(|arr| arr.into_iter().next());

        if let Some(adapter) = adapter {
            log::debug!("Chosen adapter: {:#?}", adapter.info);
            log::debug!("Chosen backend: {:?}", backend);
            log::debug!("Chosen features: {:#?}", adapter.features);
            log::debug!("Chosen limits: {:#?}", adapter.limits);

            let (device, queue) = adapter
                .inner
                .request_device(
                    &DeviceDescriptor {
                        label: None,
                        required_features: adapter.features,
                        required_limits: adapter.limits,
                    },
                    None,
                )
                .await
                .map_err(RendererInitializationError::RequestDeviceFailed)?;

            log::info!("Using {} ({:?})", adapter.info.name, backend);

            return Ok(InstanceAdapterDevice {
                instance: Arc::new(instance),
                adapter: Arc::new(adapter.inner),
                device: Arc::new(device),
                queue: Arc::new(queue),
                info: adapter.info,
            });
        }
    }

    Err(RendererInitializationError::MissingAdapter)
}

#[cfg(test)]
mod tests {
    use wgpu::{Features, Limits};

    use super::*;

    #[test]
    fn webgl2_defaults_are_enough() {
        let limits = check_limits(&Limits::downlevel_webgl2_defaults()).unwrap();
        assert!(limits.max_bind_groups >= 3);
    }

    #[test]
    fn low_limit_is_reported() {
        let device = Limits {
            max_bind_groups: 2,
            ..Limits::default()
        };
        match check_limits(&device) {
            Err(RendererInitializationError::LowDeviceLimit {
                ty,
                device_limit,
                required_limit,
            }) => {
                assert_eq!(ty, LimitType::BindGroups);
                assert_eq!(device_limit, 2);
                assert_eq!(required_limit, 3);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn device_limits_are_kept() {
        let device = Limits::default();
        let limits = check_limits(&device).unwrap();
        assert_eq!(limits.max_texture_dimension_2d, device.max_texture_dimension_2d);
    }

    #[test]
    fn optional_features_pass_through() {
        let features = check_features(Features::TIMESTAMP_QUERY | Features::DEPTH_CLIP_CONTROL).unwrap();
        assert_eq!(features, Features::TIMESTAMP_QUERY);
        assert_eq!(check_features(Features::empty()).unwrap(), Features::empty());
    }
}
