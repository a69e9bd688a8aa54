//! Folds winit events into [`CameraControls`].

use glam::DVec2;
use orrery::CameraControls;
use orrery_framework::Grabber;
use winit::{
    event::{DeviceEvent, ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

/// Pixel scroll deltas (touchpads) are converted to lines at this rate.
const PIXELS_PER_LINE: f64 = 20.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Forward,
    Backward,
    Left,
    Right,
    Boost,
    ToggleVisit,
    ReleaseCursor,
}

pub fn key_action(code: KeyCode) -> Option<KeyAction> {
    Some(match code {
        KeyCode::KeyW | KeyCode::ArrowUp => KeyAction::Forward,
        KeyCode::KeyS | KeyCode::ArrowDown => KeyAction::Backward,
        KeyCode::KeyA | KeyCode::ArrowLeft => KeyAction::Left,
        KeyCode::KeyD | KeyCode::ArrowRight => KeyAction::Right,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => KeyAction::Boost,
        KeyCode::KeyF => KeyAction::ToggleVisit,
        KeyCode::Escape => KeyAction::ReleaseCursor,
        _ => return None,
    })
}

/// Applies a key transition. Returns true when the cursor should be released.
pub fn apply_key(controls: &mut CameraControls, action: KeyAction, pressed: bool, repeat: bool) -> bool {
    match action {
        KeyAction::Forward => controls.forward = pressed,
        KeyAction::Backward => controls.backward = pressed,
        KeyAction::Left => controls.left = pressed,
        KeyAction::Right => controls.right = pressed,
        KeyAction::Boost => controls.boost = pressed,
        KeyAction::ToggleVisit => {
            if pressed && !repeat {
                controls.press_visit();
            }
        }
        KeyAction::ReleaseCursor => return pressed,
    }
    false
}

pub fn scroll_lines(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    absolute_mouse: bool,
    last_mouse_delta: Option<DVec2>,
}

impl InputState {
    pub fn new(absolute_mouse: bool) -> Self {
        Self {
            absolute_mouse,
            last_mouse_delta: None,
        }
    }

    /// Turns raw mouse motion into a look delta. Absolute mice report positions,
    /// so the first event after a grab only primes the previous position.
    fn mouse_delta(&mut self, delta: DVec2) -> Option<DVec2> {
        if self.absolute_mouse {
            let previous = self.last_mouse_delta.replace(delta)?;
            Some((delta - previous) / 4.0)
        } else {
            Some(delta)
        }
    }

    pub fn handle_event(
        &mut self,
        controls: &mut CameraControls,
        window: &Window,
        grabber: &mut Grabber,
        event: &Event<()>,
    ) {
        match event {
            Event::WindowEvent {
                event:
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                physical_key: PhysicalKey::Code(code),
                                state,
                                repeat,
                                ..
                            },
                        ..
                    },
                ..
            } => {
                let Some(action) = key_action(*code) else {
                    return;
                };
                if apply_key(controls, action, *state == ElementState::Pressed, *repeat) {
                    grabber.request_ungrab(window);
                    self.last_mouse_delta = None;
                }
            }
            Event::WindowEvent {
                event:
                    WindowEvent::MouseInput {
                        button: MouseButton::Left,
                        state,
                        ..
                    },
                ..
            } => {
                let pressed = *state == ElementState::Pressed;
                if pressed && !grabber.grabbed() {
                    grabber.request_grab(window);
                }
                controls.dragging = pressed;
            }
            Event::WindowEvent {
                event: WindowEvent::MouseWheel { delta, .. },
                ..
            } => controls.add_scroll(scroll_lines(*delta)),
            Event::WindowEvent {
                event: WindowEvent::Focused(false),
                ..
            } => {
                controls.release_all();
                grabber.request_ungrab(window);
                self.last_mouse_delta = None;
            }
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta: (x, y) },
                ..
            } => {
                if !grabber.grabbed() {
                    return;
                }
                if let Some(delta) = self.mouse_delta(DVec2::new(*x, *y)) {
                    controls.add_look(delta.x as f32, delta.y as f32);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;

    use super::*;

    #[test]
    fn movement_keys_are_level_triggered() {
        let mut controls = CameraControls::new();
        assert!(!apply_key(&mut controls, KeyAction::Forward, true, false));
        assert!(controls.forward);
        apply_key(&mut controls, KeyAction::Forward, true, true);
        assert!(controls.forward);
        apply_key(&mut controls, KeyAction::Forward, false, false);
        assert!(!controls.forward);
    }

    #[test]
    fn visit_toggles_once_per_press() {
        let mut controls = CameraControls::new();
        apply_key(&mut controls, KeyAction::ToggleVisit, true, false);
        apply_key(&mut controls, KeyAction::ToggleVisit, true, true);
        apply_key(&mut controls, KeyAction::ToggleVisit, false, false);
        assert!(controls.take_frame().toggle_visit);
    }

    #[test]
    fn escape_releases_on_press() {
        let mut controls = CameraControls::new();
        assert_eq!(key_action(KeyCode::Escape), Some(KeyAction::ReleaseCursor));
        assert!(apply_key(&mut controls, KeyAction::ReleaseCursor, true, false));
        assert!(!apply_key(&mut controls, KeyAction::ReleaseCursor, false, false));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert_eq!(key_action(KeyCode::KeyQ), None);
        assert_eq!(key_action(KeyCode::ShiftRight), Some(KeyAction::Boost));
    }

    #[test]
    fn pixel_scroll_becomes_lines() {
        assert_eq!(scroll_lines(MouseScrollDelta::LineDelta(0.0, -2.0)), -2.0);
        assert_eq!(
            scroll_lines(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 40.0))),
            2.0
        );
    }

    #[test]
    fn absolute_mouse_reports_differences() {
        let mut input = InputState::new(true);
        assert_eq!(input.mouse_delta(DVec2::new(100.0, 100.0)), None);
        assert_eq!(input.mouse_delta(DVec2::new(108.0, 96.0)), Some(DVec2::new(2.0, -1.0)));

        let mut relative = InputState::new(false);
        assert_eq!(relative.mouse_delta(DVec2::new(3.0, 4.0)), Some(DVec2::new(3.0, 4.0)));
    }
}
