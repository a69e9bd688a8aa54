//! Visit mode: leaving free flight to orbit a selected body.

use glam::Vec3;
use orrery_types::BodyId;

use crate::{
    camera::{Camera, CameraPose},
    scene::Selector,
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitCamSettings {
    /// Orbit distance as a multiple of the target's radius.
    pub distance_factor: f32,
    /// Closest the orbit cam will get to the target's center.
    pub min_distance: f32,
    /// Furthest the zoom offset can push the camera out.
    pub max_zoom_out: f32,
    /// Distance change per scroll line.
    pub zoom_step: f32,
    /// Degrees of orbit per pixel of drag.
    pub drag_sensitivity: f32,
    /// Yaw limit either side of the approach heading, degrees.
    pub max_yaw: f32,
    /// Pitch limit above and below the target's horizon, degrees.
    pub max_pitch: f32,
}

impl Default for OrbitCamSettings {
    fn default() -> Self {
        Self {
            distance_factor: 4.0,
            min_distance: 0.5,
            max_zoom_out: 40.0,
            zoom_step: 1.0,
            drag_sensitivity: 0.25,
            max_yaw: 60.0,
            max_pitch: 80.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VisitState {
    FreeFlight,
    Visiting { target: BodyId },
}

/// What a toggle did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VisitTransition {
    Entered(BodyId),
    Exited(BodyId),
}

#[derive(Debug, Clone)]
pub struct VisitMode {
    settings: OrbitCamSettings,
    state: VisitState,
    saved: Option<CameraPose>,
    zoom_offset: f32,
    yaw: f32,
    pitch: f32,
    /// Heading, in radians around world up, the camera approached from.
    heading: f32,
}

impl VisitMode {
    pub fn new(settings: OrbitCamSettings) -> Self {
        Self {
            settings,
            state: VisitState::FreeFlight,
            saved: None,
            zoom_offset: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            heading: 0.0,
        }
    }

    pub fn state(&self) -> VisitState {
        self.state
    }

    pub fn is_visiting(&self) -> bool {
        matches!(self.state, VisitState::Visiting { .. })
    }

    pub fn target(&self) -> Option<BodyId> {
        match self.state {
            VisitState::Visiting { target } => Some(target),
            VisitState::FreeFlight => None,
        }
    }

    /// The player's visit action. Enters orbit around the current selection when the
    /// selector allows it, or returns to free flight when already visiting.
    ///
    /// `target_position` looks up where a body currently is.
    pub fn toggle(
        &mut self,
        camera: &mut Camera,
        selector: &Selector,
        target_position: impl FnOnce(BodyId) -> Option<Vec3>,
    ) -> Option<VisitTransition> {
        match self.state {
            VisitState::Visiting { target } => {
                self.exit(camera);
                Some(VisitTransition::Exited(target))
            }
            VisitState::FreeFlight => {
                if !selector.can_visit() {
                    return None;
                }
                let selection = selector.selection()?;
                let position = target_position(selection.id)?;
                self.enter(camera, selection.id, position);
                Some(VisitTransition::Entered(selection.id))
            }
        }
    }

    /// Saves the camera pose and starts orbiting `target`.
    pub fn enter(&mut self, camera: &mut Camera, target: BodyId, target_position: Vec3) {
        self.saved = Some(camera.pose());
        self.zoom_offset = 0.0;
        self.yaw = 0.0;
        self.pitch = 0.0;

        let away = camera.position() - target_position;
        self.heading = if away.x.abs() + away.z.abs() > f32::EPSILON {
            away.x.atan2(away.z)
        } else {
            0.0
        };

        camera.halt();
        self.state = VisitState::Visiting { target };
    }

    /// Returns to free flight, putting the camera back exactly where it was on entry.
    pub fn exit(&mut self, camera: &mut Camera) {
        if let Some(pose) = self.saved.take() {
            camera.set_pose(pose);
        }
        camera.halt();
        self.state = VisitState::FreeFlight;
    }

    /// Accumulates drag in pixels into the orbit angles.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        let s = self.settings;
        self.yaw = (self.yaw + dx * s.drag_sensitivity).clamp(-s.max_yaw, s.max_yaw);
        self.pitch = (self.pitch + dy * s.drag_sensitivity).clamp(-s.max_pitch, s.max_pitch);
    }

    /// Positive lines zoom in.
    pub fn zoom(&mut self, lines: f32) {
        if !lines.is_finite() {
            return;
        }
        self.zoom_offset = (self.zoom_offset - lines * self.settings.zoom_step).min(self.settings.max_zoom_out);
    }

    pub fn zoom_offset(&self) -> f32 {
        self.zoom_offset
    }

    /// Yaw and pitch in degrees.
    pub fn angles(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    pub fn saved_pose(&self) -> Option<CameraPose> {
        self.saved
    }

    /// Where the orbit cam sits around a target of `radius` at `target_position`.
    pub fn orbit_pose(&self, target_position: Vec3, radius: f32) -> CameraPose {
        let base = radius.abs() * self.settings.distance_factor;
        let distance = (base + self.zoom_offset).max(self.settings.min_distance);

        let yaw = self.heading + self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        let direction = Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos());

        let position = target_position + direction * distance;
        CameraPose {
            position,
            orientation: -direction,
        }
    }

    /// Places the camera on the orbit around the target.
    pub fn apply(&mut self, camera: &mut Camera, target_position: Vec3, radius: f32) {
        let base = radius.abs() * self.settings.distance_factor;
        // Never zoom through the surface.
        self.zoom_offset = self.zoom_offset.max(self.settings.min_distance - base);
        camera.set_pose(self.orbit_pose(target_position, radius));
    }
}

#[cfg(test)]
mod tests {
    use glam::{UVec2, Vec3};
    use orrery_types::BodyId;

    use super::*;
    use crate::{
        camera::CameraSettings,
        scene::{Selection, SelectorSettings},
    };

    fn camera() -> Camera {
        Camera::new(CameraSettings::default(), UVec2::new(800, 600)).unwrap()
    }

    fn selector(distance: f32) -> Selector {
        let mut selector = Selector::new(SelectorSettings::default());
        selector.set_selection(Some(Selection { id: BodyId::Earth, distance }), false);
        selector
    }

    #[test]
    fn enter_exit_restores_pose_exactly() {
        let mut camera = camera();
        camera.mouse_look(123.0, -45.0);
        camera.move_forward();
        camera.update(0.37);
        let before = camera.pose();

        let mut visit = VisitMode::new(OrbitCamSettings::default());
        let entered = visit.toggle(&mut camera, &selector(10.0), |_| Some(Vec3::new(5.0, 1.0, 3.0)));
        assert_eq!(entered, Some(VisitTransition::Entered(BodyId::Earth)));
        assert!(visit.is_visiting());
        assert_eq!(camera.velocity(), Vec3::ZERO);

        let exited = visit.toggle(&mut camera, &selector(10.0), |_| None);
        assert_eq!(exited, Some(VisitTransition::Exited(BodyId::Earth)));
        assert_eq!(camera.pose(), before);
    }

    #[test]
    fn orbiting_then_exit_restores_pose() {
        let mut camera = camera();
        let before = camera.pose();
        let mut visit = VisitMode::new(OrbitCamSettings::default());
        visit.enter(&mut camera, BodyId::Mars, Vec3::new(20.0, 0.0, 0.0));

        visit.drag(40.0, -30.0);
        visit.zoom(-3.0);
        visit.apply(&mut camera, Vec3::new(21.0, 0.5, 0.0), 1.5);
        assert_ne!(camera.pose(), before);

        visit.exit(&mut camera);
        assert_eq!(camera.pose(), before);
        assert_eq!(visit.state(), VisitState::FreeFlight);
    }

    #[test]
    fn out_of_range_does_not_enter() {
        let mut camera = camera();
        let mut visit = VisitMode::new(OrbitCamSettings::default());
        let result = visit.toggle(&mut camera, &selector(100.0), |_| Some(Vec3::ZERO));
        assert_eq!(result, None);
        assert!(!visit.is_visiting());
    }

    #[test]
    fn entry_resets_zoom_and_angles() {
        let mut camera = camera();
        let mut visit = VisitMode::new(OrbitCamSettings::default());
        visit.enter(&mut camera, BodyId::Earth, Vec3::ZERO);
        visit.zoom(5.0);
        visit.drag(100.0, 100.0);
        visit.exit(&mut camera);

        visit.enter(&mut camera, BodyId::Earth, Vec3::ZERO);
        assert_eq!(visit.zoom_offset(), 0.0);
        assert_eq!(visit.angles(), (0.0, 0.0));
    }

    #[test]
    fn drag_is_clamped() {
        let mut visit = VisitMode::new(OrbitCamSettings::default());
        visit.drag(10_000.0, -10_000.0);
        assert_eq!(visit.angles(), (60.0, -80.0));
    }

    #[test]
    fn orbit_cam_looks_at_target() {
        let mut camera = camera();
        let mut visit = VisitMode::new(OrbitCamSettings::default());
        let target = Vec3::new(10.0, -4.0, 7.0);
        visit.enter(&mut camera, BodyId::Earth, target);
        visit.drag(25.0, 12.0);
        visit.apply(&mut camera, target, 2.0);

        let pose = camera.pose();
        let distance = pose.position.distance(target);
        assert!((distance - 8.0).abs() < 1e-4);
        let to_target = (target - pose.position).normalize();
        assert!(pose.orientation.abs_diff_eq(to_target, 1e-5));
    }

    #[test]
    fn zoom_never_passes_min_distance() {
        let mut camera = camera();
        let mut visit = VisitMode::new(OrbitCamSettings::default());
        visit.enter(&mut camera, BodyId::Moon, Vec3::ZERO);
        visit.zoom(1000.0);
        visit.apply(&mut camera, Vec3::ZERO, 1.0);
        assert!((camera.position().length() - 0.5).abs() < 1e-5);
    }
}
