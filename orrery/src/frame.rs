//! Frame timing.

use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameClockSettings {
    /// Largest delta, in seconds, a single frame may advance the simulation.
    pub max_dt: f32,
}

impl Default for FrameClockSettings {
    fn default() -> Self {
        Self { max_dt: 0.1 }
    }
}

/// Turns wall clock time into sanitized frame deltas.
///
/// Stalls (first frame, window drags, breakpoints) are clamped to
/// [`FrameClockSettings::max_dt`] so velocity and orbit integration never see a
/// huge step. Elapsed time advances by the clamped amount only.
#[derive(Debug, Clone)]
pub struct FrameClock {
    settings: FrameClockSettings,
    last: Option<Instant>,
    elapsed: f32,
}

impl FrameClock {
    pub fn new(settings: FrameClockSettings) -> Self {
        Self {
            settings,
            last: None,
            elapsed: 0.0,
        }
    }

    /// Advances to now, returning the delta for this frame.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw = match self.last.replace(now) {
            Some(last) => now.duration_since(last),
            None => Duration::ZERO,
        };
        self.advance(raw.as_secs_f32())
    }

    /// Advances by an explicit raw delta.
    pub fn advance(&mut self, raw_dt: f32) -> f32 {
        let dt = sanitize_dt(raw_dt, self.settings.max_dt);
        self.elapsed += dt;
        dt
    }

    /// Total simulated seconds.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Non-finite and negative deltas become zero, everything else is clamped to `max_dt`.
pub fn sanitize_dt(dt: f32, max_dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    dt.min(max_dt.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_are_sanitized() {
        assert_eq!(sanitize_dt(0.016, 0.1), 0.016);
        assert_eq!(sanitize_dt(4.0, 0.1), 0.1);
        assert_eq!(sanitize_dt(-1.0, 0.1), 0.0);
        assert_eq!(sanitize_dt(f32::NAN, 0.1), 0.0);
        assert_eq!(sanitize_dt(f32::INFINITY, 0.1), 0.0);
    }

    #[test]
    fn elapsed_accumulates_clamped_time() {
        let mut clock = FrameClock::new(FrameClockSettings { max_dt: 0.05 });
        clock.advance(0.02);
        clock.advance(10.0);
        assert!((clock.elapsed() - 0.07).abs() < 1e-6);
    }

    #[test]
    fn first_tick_is_zero() {
        let mut clock = FrameClock::new(FrameClockSettings::default());
        assert_eq!(clock.tick(), 0.0);
        assert!(clock.tick() <= 0.1);
    }
}
