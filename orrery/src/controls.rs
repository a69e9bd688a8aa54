//! Per-frame player input, gathered by the application and handed to [`World::update`].
//!
//! [`World::update`]: crate::World::update

use glam::Vec2;

/// Player input for one frame.
///
/// Held keys are level-triggered and stay set until released. Pointer motion,
/// scroll and the visit toggle are accumulated between frames and consumed by
/// [`CameraControls::take_frame`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CameraControls {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub boost: bool,
    /// Orbit cam dragging is active.
    pub dragging: bool,

    look_delta: Vec2,
    scroll: f32,
    visit_toggles: u32,
}

/// Edge-triggered input drained from [`CameraControls`] once per frame.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct FrameInput {
    pub look_delta: Vec2,
    pub scroll: f32,
    pub toggle_visit: bool,
}

impl CameraControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds raw pointer motion in pixels.
    pub fn add_look(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() && dy.is_finite() {
            self.look_delta += Vec2::new(dx, dy);
        }
    }

    /// Adds scroll in lines. Positive values zoom in.
    pub fn add_scroll(&mut self, lines: f32) {
        if lines.is_finite() {
            self.scroll += lines;
        }
    }

    /// Records one press of the visit key.
    pub fn press_visit(&mut self) {
        self.visit_toggles += 1;
    }

    /// Drains accumulated deltas.
    ///
    /// An even number of visit presses within one frame cancel out.
    pub fn take_frame(&mut self) -> FrameInput {
        let input = FrameInput {
            look_delta: self.look_delta,
            scroll: self.scroll,
            toggle_visit: self.visit_toggles % 2 == 1,
        };
        self.look_delta = Vec2::ZERO;
        self.scroll = 0.0;
        self.visit_toggles = 0;
        input
    }

    /// Releases every held key. Used when the window loses focus.
    pub fn release_all(&mut self) {
        self.forward = false;
        self.backward = false;
        self.left = false;
        self.right = false;
        self.boost = false;
        self.dragging = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_input_is_drained() {
        let mut controls = CameraControls::new();
        controls.forward = true;
        controls.add_look(3.0, -2.0);
        controls.add_look(1.0, 1.0);
        controls.add_scroll(2.0);
        controls.press_visit();

        let input = controls.take_frame();
        assert_eq!(input.look_delta, Vec2::new(4.0, -1.0));
        assert_eq!(input.scroll, 2.0);
        assert!(input.toggle_visit);

        assert_eq!(controls.take_frame(), FrameInput::default());
        assert!(controls.forward);
    }

    #[test]
    fn double_press_cancels() {
        let mut controls = CameraControls::new();
        controls.press_visit();
        controls.press_visit();
        assert!(!controls.take_frame().toggle_visit);
    }

    #[test]
    fn non_finite_motion_is_dropped() {
        let mut controls = CameraControls::new();
        controls.add_look(f32::NAN, 1.0);
        controls.add_scroll(f32::INFINITY);
        assert_eq!(controls.take_frame(), FrameInput::default());
    }
}
