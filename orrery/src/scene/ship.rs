use glam::{Mat4, Vec3};

use crate::camera::Camera;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShipSettings {
    /// Ship position in view space. The camera looks down -Z.
    pub offset: Vec3,
    pub scale: f32,
}

impl Default for ShipSettings {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, -1.2, -4.0),
            scale: 0.6,
        }
    }
}

/// World transform of the player ship: a fixed view space offset, banked by the
/// camera's roll and pitch.
pub fn ship_transform(camera: &Camera, settings: &ShipSettings) -> Mat4 {
    camera.view().inverse()
        * Mat4::from_translation(settings.offset)
        * Mat4::from_rotation_z(camera.roll().to_radians())
        * Mat4::from_rotation_x(camera.pitch().to_radians())
        * Mat4::from_scale(Vec3::splat(settings.scale))
}

#[cfg(test)]
mod tests {
    use glam::{UVec2, Vec3};

    use super::*;
    use crate::camera::CameraSettings;

    #[test]
    fn ship_sits_ahead_and_below_camera() {
        let camera = Camera::new(CameraSettings::default(), UVec2::new(800, 600)).unwrap();
        let settings = ShipSettings::default();
        let ship = ship_transform(&camera, &settings).w_axis.truncate();

        let relative = ship - camera.position();
        // Default camera looks down +Z with +Y up.
        assert!(relative.dot(camera.rotation()) > 3.9);
        assert!(relative.y < -1.0);
    }

    #[test]
    fn ship_follows_camera() {
        let mut camera = Camera::new(CameraSettings::default(), UVec2::new(800, 600)).unwrap();
        let settings = ShipSettings::default();
        let before = ship_transform(&camera, &settings);
        camera.set_position(camera.position() + Vec3::new(10.0, 0.0, 0.0));
        let after = ship_transform(&camera, &settings);
        let moved = after.w_axis.truncate() - before.w_axis.truncate();
        assert!(moved.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-3));
    }
}
