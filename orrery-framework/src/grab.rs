use winit::window::{CursorGrabMode, Window};

/// Tracks whether the cursor is captured for mouse look.
#[derive(Debug, Default)]
pub struct Grabber {
    grabbed: bool,
}
impl Grabber {
    pub fn new() -> Self {
        Self { grabbed: false }
    }

    /// Locks the cursor in place, falling back to confining it to the window
    /// on platforms without pointer locking.
    pub fn request_grab(&mut self, window: &Window) {
        if let Err(locked) = window.set_cursor_grab(CursorGrabMode::Locked) {
            if let Err(confined) = window.set_cursor_grab(CursorGrabMode::Confined) {
                log::debug!("Cursor grab unavailable: {locked}, {confined}");
            }
        }
        window.set_cursor_visible(false);

        self.grabbed = true;
    }

    pub fn request_ungrab(&mut self, window: &Window) {
        let _ = window.set_cursor_grab(CursorGrabMode::None);
        window.set_cursor_visible(true);

        self.grabbed = false;
    }

    pub fn grabbed(&self) -> bool {
        self.grabbed
    }
}
