use glam::{Mat4, Vec3};
use orrery_types::BodyId;

/// Fixed orbital description of a body relative to its parent.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitalParams {
    /// Angular speed of the orbit along each axis, radians per second.
    pub speed: Vec3,
    /// Orbit radius along each axis.
    pub distance: Vec3,
    /// Spin around `spin_axis`, radians per second.
    pub spin_rate: f32,
    pub spin_axis: Vec3,
    pub scale: Vec3,
}

impl OrbitalParams {
    /// A body sitting still at its parent's origin.
    pub fn fixed(scale: f32) -> Self {
        Self {
            speed: Vec3::ZERO,
            distance: Vec3::ZERO,
            spin_rate: 0.0,
            spin_axis: Vec3::Y,
            scale: Vec3::splat(scale),
        }
    }

    /// Circular orbit in the parent's XZ plane.
    pub fn circular(radius: f32, speed: f32, spin_rate: f32, scale: f32) -> Self {
        Self {
            speed: Vec3::new(speed, 0.0, speed),
            distance: Vec3::new(radius, 0.0, radius),
            spin_rate,
            spin_axis: Vec3::Y,
            scale: Vec3::splat(scale),
        }
    }

    pub fn translation(&self, t: f32) -> Vec3 {
        Vec3::new(
            (self.speed.x * t).cos() * self.distance.x,
            (self.speed.y * t).sin() * self.distance.y,
            (self.speed.z * t).sin() * self.distance.z,
        )
    }

    /// Transform from this body's space into its parent's: `translate * rotate * scale`.
    pub fn local_matrix(&self, t: f32) -> Mat4 {
        let axis = self.spin_axis.try_normalize().unwrap_or(Vec3::Y);
        Mat4::from_translation(self.translation(t))
            * Mat4::from_axis_angle(axis, self.spin_rate * t)
            * Mat4::from_scale(self.scale)
    }
}

/// One entry in the pre-order body list.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BodyDesc {
    pub id: BodyId,
    pub orbit: OrbitalParams,
    /// Nesting depth; zero is a child of the system root.
    pub depth: usize,
    /// Drawn without lighting, for emissive bodies.
    pub unlit: bool,
    /// Asset path of the surface texture, relative to the asset root.
    pub texture: Option<&'static str>,
}

impl BodyDesc {
    pub fn new(id: BodyId, depth: usize, orbit: OrbitalParams) -> Self {
        Self {
            id,
            orbit,
            depth,
            unlit: false,
            texture: None,
        }
    }

    pub fn unlit(mut self) -> Self {
        self.unlit = true;
        self
    }

    pub fn with_texture(mut self, path: &'static str) -> Self {
        self.texture = Some(path);
        self
    }
}
