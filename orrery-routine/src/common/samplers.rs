use orrery::util::bind_merge::BindGroupLayoutBuilder;
use wgpu::{AddressMode, BindingType, Device, FilterMode, Sampler, SamplerBindingType, SamplerDescriptor, ShaderStages};

/// Container holding the samplers every routine shares.
pub struct Samplers {
    /// Trilinear, repeating. Used for mesh textures and the skybox.
    pub linear: Sampler,
    /// Bilinear, clamped to the edge. Used by the post processing passes.
    pub clamp: Sampler,
}

impl Samplers {
    pub fn new(device: &Device) -> Self {
        profiling::scope!("Samplers::new");

        let linear = create_sampler(device, "linear", AddressMode::Repeat);
        let clamp = create_sampler(device, "clamp", AddressMode::ClampToEdge);

        Self { linear, clamp }
    }

    /// Add a filtering sampler binding to the given bind group layout builder.
    pub fn add_to_bgl(bglb: &mut BindGroupLayoutBuilder) {
        bglb.append(
            ShaderStages::FRAGMENT,
            BindingType::Sampler(SamplerBindingType::Filtering),
            None,
        );
    }
}

fn create_sampler(device: &Device, label: &str, address_mode: AddressMode) -> Sampler {
    device.create_sampler(&SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        mipmap_filter: FilterMode::Linear,
        lod_min_clamp: 0.0,
        lod_max_clamp: 100.0,
        compare: None,
        anisotropy_clamp: 1,
        border_color: None,
    })
}
