//! Free flight camera.
//!
//! The camera owns pose and motion state only. View and projection matrices
//! are derived from that state on every query and never stored.

use glam::{Mat4, Quat, UVec2, Vec3};
use thiserror::Error;

/// Smallest angle, in degrees, the look direction may make with world up.
pub const MIN_ANGLE_TO_UP: f32 = 5.0;
/// Largest angle, in degrees, the look direction may make with world up.
pub const MAX_ANGLE_TO_UP: f32 = 180.0 - MIN_ANGLE_TO_UP;

/// Speeds below this are snapped to rest.
const VELOCITY_EPSILON: f32 = 1.0e-4;
/// How quickly the bank scalars chase their targets, per second.
const BANK_RATE: f32 = 6.0;
/// Degrees of bank per degree of look movement in a frame.
const BANK_PER_DEGREE: f32 = 1.5;
/// Bank is limited to this many degrees either way.
const MAX_BANK: f32 = 30.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("Viewport of {width}x{height} has a zero dimension")]
    InvalidViewport { width: u32, height: u32 },
}

/// How `move_*` calls turn into motion.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum MovementMode {
    /// Moves accumulate into a velocity that decays with friction.
    #[default]
    Inertial,
    /// Moves offset the position directly during the next update.
    Direct,
}

/// Tunables for the camera, fixed for a session.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraSettings {
    pub spawn_position: Vec3,
    pub spawn_orientation: Vec3,
    pub up: Vec3,
    /// Units per second at unit velocity.
    pub base_speed: f32,
    /// Exponential velocity decay rate, per second.
    pub friction: f32,
    /// Degrees of rotation for a pointer movement spanning the whole viewport.
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub movement: MovementMode,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            spawn_position: Vec3::new(0.0, 30.0, -60.0),
            spawn_orientation: Vec3::Z,
            up: Vec3::Y,
            base_speed: 0.2,
            friction: 2.5,
            mouse_sensitivity: 100.0,
            fov: 80.0,
            near: 0.01,
            far: 500.0,
            movement: MovementMode::Inertial,
        }
    }
}

/// Position and look direction, enough to put the camera back exactly where it was.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub orientation: Vec3,
}

#[derive(Debug, Clone)]
pub struct Camera {
    settings: CameraSettings,
    viewport: UVec2,

    position: Vec3,
    orientation: Vec3,
    velocity: Vec3,
    /// Direction requested this frame in [`MovementMode::Direct`].
    pending: Vec3,
    extra_speed: f32,

    fov: f32,

    roll: f32,
    pitch: f32,
    roll_target: f32,
    pitch_target: f32,
}

impl Camera {
    /// Creates a camera at the spawn pose of `settings`.
    pub fn new(settings: CameraSettings, viewport: UVec2) -> Result<Self, CameraError> {
        if viewport.x == 0 || viewport.y == 0 {
            return Err(CameraError::InvalidViewport {
                width: viewport.x,
                height: viewport.y,
            });
        }

        Ok(Self {
            viewport,
            position: settings.spawn_position,
            orientation: settings.spawn_orientation.normalize_or_zero(),
            velocity: Vec3::ZERO,
            pending: Vec3::ZERO,
            extra_speed: 0.0,
            fov: settings.fov.clamp(1.0, 179.0),
            roll: 0.0,
            pitch: 0.0,
            roll_target: 0.0,
            pitch_target: 0.0,
            settings,
        })
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Updates the viewport the camera projects onto. Zero dimensions are treated as one.
    pub fn resize(&mut self, viewport: UVec2) {
        self.viewport = viewport.max(UVec2::ONE);
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.viewport.x as f32 / self.viewport.y as f32
    }

    /// Turns the camera by a pointer delta in pixels.
    ///
    /// Pitch is applied first, around the camera's right axis, and is limited so the look
    /// direction stays between [`MIN_ANGLE_TO_UP`] and [`MAX_ANGLE_TO_UP`] degrees from world up.
    /// Yaw is then applied around world up.
    pub fn mouse_look(&mut self, dx: f32, dy: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }

        let yaw = self.settings.mouse_sensitivity * dx / self.viewport.x as f32;
        let pitch = self.settings.mouse_sensitivity * dy / self.viewport.y as f32;

        let up = self.settings.up;

        // Looking straight along up leaves no right axis to pitch around.
        if let Some(right) = self.orientation.cross(up).try_normalize() {
            let current = self.orientation.angle_between(up).to_degrees();
            let target = (current + pitch).clamp(MIN_ANGLE_TO_UP, MAX_ANGLE_TO_UP);
            let applied = target - current;
            self.orientation = Quat::from_axis_angle(right, -applied.to_radians()) * self.orientation;
        }

        self.orientation = (Quat::from_axis_angle(up, -yaw.to_radians()) * self.orientation).normalize();

        self.roll_target = (self.roll_target - yaw * BANK_PER_DEGREE).clamp(-MAX_BANK, MAX_BANK);
        self.pitch_target = (self.pitch_target - pitch * BANK_PER_DEGREE).clamp(-MAX_BANK, MAX_BANK);
    }

    fn right(&self) -> Vec3 {
        self.orientation.cross(self.settings.up).normalize_or_zero()
    }

    fn push(&mut self, direction: Vec3) {
        match self.settings.movement {
            MovementMode::Inertial => self.velocity += direction,
            MovementMode::Direct => self.pending += direction,
        }
    }

    pub fn move_forward(&mut self) {
        self.push(self.orientation);
    }

    pub fn move_backward(&mut self) {
        self.push(-self.orientation);
    }

    pub fn move_left(&mut self) {
        self.push(-self.right());
    }

    pub fn move_right(&mut self) {
        self.push(self.right());
    }

    /// Integrates one frame of motion. Must be called once per frame after all `move_*` calls.
    ///
    /// Non-finite or negative `dt` is treated as zero.
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let speed = self.settings.base_speed + self.extra_speed;

        match self.settings.movement {
            MovementMode::Inertial => {
                self.position += self.velocity * speed * dt;

                self.velocity *= (-self.settings.friction * dt).exp();
                if self.velocity.length() < VELOCITY_EPSILON {
                    self.velocity = Vec3::ZERO;
                }
            }
            MovementMode::Direct => {
                self.position += self.pending.normalize_or_zero() * speed * dt;
                self.pending = Vec3::ZERO;
            }
        }

        let ease = 1.0 - (-BANK_RATE * dt).exp();
        self.roll += (self.roll_target - self.roll) * ease;
        self.pitch += (self.pitch_target - self.pitch) * ease;
        self.roll_target *= 1.0 - ease;
        self.pitch_target *= 1.0 - ease;
    }

    /// Stops all motion, including motion requested but not yet integrated.
    pub fn halt(&mut self) {
        self.velocity = Vec3::ZERO;
        self.pending = Vec3::ZERO;
    }

    pub fn set_extra_speed(&mut self, speed: f32) {
        self.extra_speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
    }

    /// Sets the vertical field of view in degrees, clamped to `[1, 179]`.
    pub fn set_fov(&mut self, degrees: f32) {
        if degrees.is_finite() {
            self.fov = degrees.clamp(1.0, 179.0);
        }
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.orientation, self.settings.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect_ratio(),
            self.settings.near,
            self.settings.far,
        )
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// The unit look direction.
    pub fn rotation(&self) -> Vec3 {
        self.orientation
    }

    pub fn set_rotation(&mut self, orientation: Vec3) {
        if let Some(orientation) = orientation.try_normalize() {
            self.orientation = orientation;
        }
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            orientation: self.orientation,
        }
    }

    /// Restores a pose taken with [`Camera::pose`] without touching its values.
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.position = pose.position;
        self.orientation = pose.orientation;
    }

    /// Current ship roll in degrees.
    pub fn roll(&self) -> f32 {
        self.roll
    }

    /// Current ship pitch in degrees.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }
}

#[cfg(test)]
mod tests {
    use glam::{UVec2, Vec3};

    use super::*;

    fn camera() -> Camera {
        Camera::new(CameraSettings::default(), UVec2::new(1280, 720)).unwrap()
    }

    #[test]
    fn zero_viewport_is_rejected() {
        assert_eq!(
            Camera::new(CameraSettings::default(), UVec2::new(0, 720)).unwrap_err(),
            CameraError::InvalidViewport { width: 0, height: 720 }
        );
    }

    #[test]
    fn forward_then_update_moves_base_speed_times_dt() {
        let mut camera = camera();
        let start = camera.position();
        let orientation = camera.rotation();

        camera.move_forward();
        camera.update(0.1);

        let expected = start + orientation * camera.settings().base_speed * 0.1;
        assert!(camera.position().abs_diff_eq(expected, 1e-5));

        let speed = camera.velocity().length();
        assert!(speed > 0.0 && speed < 1.0);
        camera.update(0.1);
        assert!(camera.velocity().length() < speed);
    }

    #[test]
    fn velocity_settles_to_rest() {
        let mut camera = camera();
        camera.move_left();
        for _ in 0..1000 {
            camera.update(0.05);
        }
        assert_eq!(camera.velocity(), Vec3::ZERO);
    }

    #[test]
    fn direct_mode_has_no_inertia() {
        let settings = CameraSettings {
            movement: MovementMode::Direct,
            ..CameraSettings::default()
        };
        let mut camera = Camera::new(settings, UVec2::new(800, 600)).unwrap();
        let start = camera.position();

        camera.move_right();
        camera.update(0.5);
        let moved = camera.position();
        assert!((moved - start).length() > 0.0);

        camera.update(0.5);
        assert_eq!(camera.position(), moved);
    }

    #[test]
    fn degenerate_dt_does_not_move() {
        let mut camera = camera();
        let start = camera.position();
        camera.move_forward();
        camera.update(f32::NAN);
        camera.update(f32::INFINITY);
        camera.update(-3.0);
        assert_eq!(camera.position(), start);
    }

    #[test]
    fn pitch_stays_within_guard() {
        let mut camera = camera();
        let up = camera.settings().up;

        for &(dx, dy) in &[
            (0.0, 5000.0),
            (13.0, 700.0),
            (-40.0, -9000.0),
            (250.0, -1.0),
            (0.0, 720.0),
            (0.0, -720.0),
            (1.0, 100_000.0),
        ] {
            camera.mouse_look(dx, dy);
            let angle = camera.rotation().angle_between(up).to_degrees();
            assert!(
                (MIN_ANGLE_TO_UP - 1e-3..=MAX_ANGLE_TO_UP + 1e-3).contains(&angle),
                "angle {angle} escaped the guard"
            );
        }
    }

    #[test]
    fn non_finite_look_is_ignored() {
        let mut camera = camera();
        let before = camera.rotation();
        camera.mouse_look(f32::NAN, 3.0);
        camera.mouse_look(1.0, f32::INFINITY);
        assert_eq!(camera.rotation(), before);
    }

    #[test]
    fn look_speed_is_resolution_independent() {
        let mut small = Camera::new(CameraSettings::default(), UVec2::new(640, 360)).unwrap();
        let mut large = Camera::new(CameraSettings::default(), UVec2::new(1280, 720)).unwrap();
        small.mouse_look(32.0, 18.0);
        large.mouse_look(64.0, 36.0);
        assert!(small.rotation().abs_diff_eq(large.rotation(), 1e-5));
    }

    #[test]
    fn pose_round_trips_exactly() {
        let mut camera = camera();
        camera.mouse_look(37.0, -12.0);
        camera.move_forward();
        camera.update(0.3);

        let pose = camera.pose();
        camera.set_position(Vec3::splat(4.0));
        camera.set_rotation(Vec3::X);
        camera.set_pose(pose);
        assert_eq!(camera.pose(), pose);
    }

    #[test]
    fn fov_is_clamped() {
        let mut camera = camera();
        camera.set_fov(500.0);
        assert_eq!(camera.fov(), 179.0);
        camera.set_fov(-2.0);
        assert_eq!(camera.fov(), 1.0);
    }

    #[test]
    fn view_tracks_latest_pose() {
        let mut camera = camera();
        let before = camera.view();
        camera.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert_ne!(camera.view(), before);
        let eye = camera.view().inverse().w_axis.truncate();
        assert!(eye.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-4));
    }

    #[test]
    fn looking_banks_then_recovers() {
        let mut camera = camera();
        camera.mouse_look(200.0, 0.0);
        camera.update(0.016);
        assert!(camera.roll() < 0.0);
        for _ in 0..600 {
            camera.update(0.016);
        }
        assert!(camera.roll().abs() < 1e-2);
    }
}
