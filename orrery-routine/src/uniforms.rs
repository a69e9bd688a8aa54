//! GPU side layouts of every uniform buffer, and the CPU staging that fills them.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2, Vec4};
use orrery::world::{FrameSnapshot, MAX_LIGHTS};

/// Distance between per-object uniform slots. This is the largest
/// `min_uniform_buffer_offset_alignment` wgpu allows, so it works everywhere.
pub const OBJECT_UNIFORM_STRIDE: u64 = 256;
/// Slots in the per-object uniform buffer.
pub const MAX_OBJECTS: usize = 64;

/// Skip lighting, output the tinted texture as is.
pub const FLAG_UNLIT: u32 = 1;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightAbi {
    /// w is the intensity.
    pub position: Vec4,
    pub color: Vec4,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    /// Inverse of the projection times the rotation-only view, used by the skybox.
    pub inv_sky_view_projection: Mat4,
    pub camera_position: Vec4,
    pub ambient: Vec4,
    pub lights: [LightAbi; MAX_LIGHTS],
    pub light_count: u32,
    pub time: f32,
    pub _padding: [u32; 2],
}

impl FrameUniforms {
    pub fn new(snapshot: &FrameSnapshot, ambient: Vec4) -> Self {
        let mut lights = [LightAbi::default(); MAX_LIGHTS];
        let mut light_count = 0;
        for (slot, light) in lights.iter_mut().zip(&snapshot.lights) {
            *slot = LightAbi {
                position: light.position.extend(light.intensity),
                color: light.color.extend(1.0),
            };
            light_count += 1;
        }

        let sky_view = Mat4::from_mat3(Mat3::from_mat4(snapshot.view));

        Self {
            view: snapshot.view,
            projection: snapshot.projection,
            view_projection: snapshot.view_projection(),
            inv_sky_view_projection: (snapshot.projection * sky_view).inverse(),
            camera_position: snapshot.camera_position.extend(1.0),
            ambient,
            lights,
            light_count,
            time: snapshot.elapsed,
            _padding: [0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: Mat4,
    /// Inverse transpose of the model's upper 3x3, padded out to a full matrix.
    pub normal: Mat4,
    pub tint: Vec4,
    pub flags: u32,
    pub _padding: [u32; 3],
}

impl ObjectUniforms {
    pub fn new(model: Mat4, tint: Vec4, flags: u32) -> Self {
        Self {
            model,
            normal: normal_matrix(model),
            tint,
            flags,
            _padding: [0; 3],
        }
    }
}

pub fn normal_matrix(model: Mat4) -> Mat4 {
    let upper = Mat3::from_mat4(model);
    if upper.determinant().abs() <= f32::EPSILON {
        return Mat4::IDENTITY;
    }
    Mat4::from_mat3(upper.inverse().transpose())
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BlurUniforms {
    pub direction: Vec2,
    pub _padding: Vec2,
}

impl BlurUniforms {
    pub fn new(direction: Vec2) -> Self {
        Self {
            direction,
            _padding: Vec2::ZERO,
        }
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CompositeUniforms {
    pub exposure: f32,
    pub bloom_strength: f32,
    pub gamma: f32,
    pub _padding: f32,
}

/// CPU copy of the per-object uniform buffer.
///
/// Every object gets its own [`OBJECT_UNIFORM_STRIDE`] sized slot and is
/// addressed with a dynamic offset, so the whole frame is one buffer write.
#[derive(Debug, Default)]
pub struct ObjectSlots {
    data: Vec<u8>,
}

impl ObjectSlots {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(MAX_OBJECTS * OBJECT_UNIFORM_STRIDE as usize),
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len() / OBJECT_UNIFORM_STRIDE as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stores `uniforms` in the next free slot and returns its dynamic offset,
    /// or `None` once all [`MAX_OBJECTS`] slots are taken.
    pub fn push(&mut self, uniforms: &ObjectUniforms) -> Option<u32> {
        if self.len() >= MAX_OBJECTS {
            return None;
        }

        let offset = self.data.len();
        self.data.resize(offset + OBJECT_UNIFORM_STRIDE as usize, 0);
        self.data[offset..offset + size_of::<ObjectUniforms>()].copy_from_slice(bytemuck::bytes_of(uniforms));

        Some(offset as u32)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4Swizzles};
    use orrery::world::LightSnapshot;

    use super::*;

    fn snapshot() -> FrameSnapshot {
        FrameSnapshot {
            elapsed: 2.5,
            view: Mat4::look_to_rh(Vec3::new(10.0, 4.0, 30.0), Vec3::NEG_Z, Vec3::Y),
            projection: Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0),
            camera_position: Vec3::new(10.0, 4.0, 30.0),
            bodies: Vec::new(),
            highlighted: None,
            selection: None,
            visiting: None,
            ship: None,
            lights: Vec::new(),
            belt: None,
            particles: Vec::new(),
        }
    }

    #[test]
    fn layouts_match_the_shaders() {
        assert_eq!(size_of::<LightAbi>(), 32);
        assert_eq!(size_of::<FrameUniforms>(), 432);
        assert_eq!(size_of::<ObjectUniforms>(), 160);
        assert_eq!(size_of::<BlurUniforms>(), 16);
        assert_eq!(size_of::<CompositeUniforms>(), 16);
        assert!(size_of::<ObjectUniforms>() as u64 <= OBJECT_UNIFORM_STRIDE);
    }

    #[test]
    fn lights_are_packed_in_order() {
        let mut snapshot = snapshot();
        snapshot.lights = vec![
            LightSnapshot {
                position: Vec3::ZERO,
                color: Vec3::ONE,
                intensity: 2.0,
                marker: false,
            },
            LightSnapshot {
                position: Vec3::new(0.0, 50.0, 0.0),
                color: Vec3::new(1.0, 0.5, 0.0),
                intensity: 0.5,
                marker: true,
            },
        ];

        let uniforms = FrameUniforms::new(&snapshot, Vec4::splat(0.1));
        assert_eq!(uniforms.light_count, 2);
        assert_eq!(uniforms.lights[0].position, Vec4::new(0.0, 0.0, 0.0, 2.0));
        assert_eq!(uniforms.lights[1].color, Vec4::new(1.0, 0.5, 0.0, 1.0));
        assert_eq!(uniforms.lights[2], LightAbi::default());
        assert_eq!(uniforms.time, 2.5);
    }

    #[test]
    fn sky_direction_ignores_camera_position() {
        let uniforms = FrameUniforms::new(&snapshot(), Vec4::ZERO);

        let far = uniforms.inv_sky_view_projection * Vec4::new(0.0, 0.0, 1.0, 1.0);
        let direction = (far.xyz() / far.w).normalize();
        assert!(direction.abs_diff_eq(Vec3::NEG_Z, 1.0e-3), "{direction}");
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let normal = normal_matrix(model).transform_vector3(Vec3::new(1.0, 1.0, 0.0));
        assert!(normal.abs_diff_eq(Vec3::new(0.5, 1.0, 0.0), 1.0e-6));

        assert_eq!(normal_matrix(Mat4::from_scale(Vec3::ZERO)), Mat4::IDENTITY);
    }

    #[test]
    fn object_slots_are_aligned_and_bounded() {
        let mut slots = ObjectSlots::new();
        let uniforms = ObjectUniforms::new(Mat4::IDENTITY, Vec4::ONE, FLAG_UNLIT);

        assert_eq!(slots.push(&uniforms), Some(0));
        assert_eq!(slots.push(&uniforms), Some(256));
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.as_bytes().len(), 512);

        for _ in 2..MAX_OBJECTS {
            assert!(slots.push(&uniforms).is_some());
        }
        assert_eq!(slots.push(&uniforms), None);
        assert_eq!(slots.len(), MAX_OBJECTS);

        slots.clear();
        assert!(slots.is_empty());
    }
}
