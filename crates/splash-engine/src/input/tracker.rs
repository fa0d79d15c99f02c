//! Pointer position and smoothed velocity.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::queue::InputEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Weight of the previous velocity when blending in a new sample, in [0, 1).
    pub smoothing: f32,
    /// Smoothed velocity magnitude cap, px/s.
    pub max_speed: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.65,
            max_speed: 4000.0,
        }
    }
}

/// One pointer observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub position: Vec2,
    pub timestamp_ms: f64,
    pub pressed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub position: Vec2,
    pub last_position: Vec2,
    /// Smoothed velocity in px/s.
    pub velocity: Vec2,
    pub pressed: bool,
    /// False until the first sample, and again after the pointer leaves.
    pub present: bool,
}

#[derive(Debug, Clone)]
pub struct VelocityTracker {
    config: TrackerConfig,
    state: PointerState,
    /// Position and time of the last sample that advanced the clock.
    anchor: Option<(Vec2, f64)>,
    press_pending: bool,
    moved: bool,
}

impl VelocityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: PointerState::default(),
            anchor: None,
            press_pending: false,
            moved: false,
        }
    }

    pub fn set_config(&mut self, config: TrackerConfig) {
        self.config = config;
        self.clamp_velocity();
    }

    pub fn state(&self) -> &PointerState {
        &self.state
    }

    pub fn velocity(&self) -> Vec2 {
        self.state.velocity
    }

    pub fn has_position(&self) -> bool {
        self.state.present
    }

    /// Feed one sample. A sample that does not advance time updates position only.
    pub fn sample(&mut self, s: PointerSample) {
        if !s.position.is_finite() || !s.timestamp_ms.is_finite() {
            return;
        }
        if s.pressed && !self.state.pressed {
            self.press_pending = true;
        }
        self.state.pressed = s.pressed;

        if !self.state.present {
            self.state.position = s.position;
            self.state.last_position = s.position;
            self.state.present = true;
            self.anchor = Some((s.position, s.timestamp_ms));
            return;
        }

        self.state.last_position = self.state.position;
        self.state.position = s.position;

        let Some((anchor_pos, anchor_t)) = self.anchor else {
            self.anchor = Some((s.position, s.timestamp_ms));
            return;
        };
        let dt = ((s.timestamp_ms - anchor_t) / 1000.0) as f32;
        if dt <= 0.0 {
            return;
        }
        let instant = (s.position - anchor_pos) / dt;
        let blend = 1.0 - self.config.smoothing.clamp(0.0, 0.99);
        self.state.velocity = self.state.velocity.lerp(instant, blend);
        self.clamp_velocity();
        self.anchor = Some((s.position, s.timestamp_ms));
        self.moved = true;
    }

    /// Translate a host event into a sample.
    pub fn handle(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::PointerMove { x, y, t } => self.sample(PointerSample {
                position: Vec2::new(x, y),
                timestamp_ms: t,
                pressed: self.state.pressed,
            }),
            InputEvent::PointerDown { x, y, t } => self.sample(PointerSample {
                position: Vec2::new(x, y),
                timestamp_ms: t,
                pressed: true,
            }),
            InputEvent::PointerUp { x, y, t } => self.sample(PointerSample {
                position: Vec2::new(x, y),
                timestamp_ms: t,
                pressed: false,
            }),
            InputEvent::PointerLeave { .. } => self.leave(),
        }
    }

    /// Close out a frame. Without new motion the velocity relaxes toward zero,
    /// at the same per-frame rate smoothing would pull it toward a still pointer.
    pub fn end_frame(&mut self, dt: f32) {
        if !self.moved && dt > 0.0 {
            let keep = self.config.smoothing.clamp(0.0, 0.99).powf(dt * 60.0);
            self.state.velocity *= keep;
            if self.state.velocity.length_squared() < 1e-4 {
                self.state.velocity = Vec2::ZERO;
            }
        }
        self.moved = false;
    }

    /// True once per press.
    pub fn take_press(&mut self) -> bool {
        std::mem::take(&mut self.press_pending)
    }

    pub fn leave(&mut self) {
        self.state.present = false;
        self.state.pressed = false;
        self.state.velocity = Vec2::ZERO;
        self.anchor = None;
        self.press_pending = false;
    }

    pub fn reset(&mut self) {
        self.state = PointerState::default();
        self.anchor = None;
        self.press_pending = false;
        self.moved = false;
    }

    fn clamp_velocity(&mut self) {
        self.state.velocity = self
            .state
            .velocity
            .clamp_length_max(self.config.max_speed.max(0.0));
    }
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(x: f32, y: f32, t: f64) -> InputEvent {
        InputEvent::PointerMove { x, y, t }
    }

    #[test]
    fn first_sample_sets_position_only() {
        let mut tr = VelocityTracker::default();
        tr.handle(&mv(10.0, 20.0, 0.0));
        assert!(tr.state().present);
        assert_eq!(tr.state().position, Vec2::new(10.0, 20.0));
        assert_eq!(tr.velocity(), Vec2::ZERO);
    }

    #[test]
    fn velocity_from_displacement() {
        let mut tr = VelocityTracker::new(TrackerConfig {
            smoothing: 0.0,
            max_speed: 10_000.0,
        });
        tr.handle(&mv(0.0, 0.0, 0.0));
        tr.handle(&mv(10.0, 0.0, 10.0));
        assert!((tr.velocity().x - 1000.0).abs() < 1e-2);
    }

    #[test]
    fn smoothing_blends() {
        let mut tr = VelocityTracker::new(TrackerConfig {
            smoothing: 0.5,
            max_speed: 10_000.0,
        });
        tr.handle(&mv(0.0, 0.0, 0.0));
        tr.handle(&mv(10.0, 0.0, 10.0));
        assert!((tr.velocity().x - 500.0).abs() < 1e-2);
    }

    #[test]
    fn zero_dt_updates_position_only() {
        let mut tr = VelocityTracker::new(TrackerConfig {
            smoothing: 0.0,
            max_speed: 10_000.0,
        });
        tr.handle(&mv(0.0, 0.0, 5.0));
        tr.handle(&mv(50.0, 0.0, 5.0));
        assert_eq!(tr.velocity(), Vec2::ZERO);
        assert_eq!(tr.state().position, Vec2::new(50.0, 0.0));
        tr.handle(&mv(50.0, 0.0, 3.0));
        assert!(tr.velocity().is_finite());
        assert_eq!(tr.velocity(), Vec2::ZERO);
    }

    #[test]
    fn speed_is_capped() {
        let mut tr = VelocityTracker::new(TrackerConfig {
            smoothing: 0.0,
            max_speed: 300.0,
        });
        tr.handle(&mv(0.0, 0.0, 0.0));
        tr.handle(&mv(1000.0, 1000.0, 1.0));
        assert!(tr.velocity().length() <= 300.0 + 1e-3);
    }

    #[test]
    fn press_edge_reported_once() {
        let mut tr = VelocityTracker::default();
        tr.handle(&InputEvent::PointerDown { x: 1.0, y: 1.0, t: 0.0 });
        assert!(tr.take_press());
        assert!(!tr.take_press());
        tr.handle(&mv(2.0, 1.0, 5.0));
        assert!(!tr.take_press(), "moving while held is not a new press");
        tr.handle(&InputEvent::PointerUp { x: 2.0, y: 1.0, t: 6.0 });
        tr.handle(&InputEvent::PointerDown { x: 2.0, y: 1.0, t: 7.0 });
        assert!(tr.take_press());
    }

    #[test]
    fn idle_frames_decay_velocity() {
        let mut tr = VelocityTracker::default();
        tr.handle(&mv(0.0, 0.0, 0.0));
        tr.handle(&mv(30.0, 0.0, 16.0));
        tr.end_frame(1.0 / 60.0);
        let moving = tr.velocity().length();
        assert!(moving > 0.0);
        for _ in 0..120 {
            tr.end_frame(1.0 / 60.0);
        }
        assert_eq!(tr.velocity(), Vec2::ZERO);
    }

    #[test]
    fn leave_clears_presence() {
        let mut tr = VelocityTracker::default();
        tr.handle(&mv(0.0, 0.0, 0.0));
        tr.handle(&mv(30.0, 0.0, 16.0));
        tr.handle(&InputEvent::PointerLeave { t: 20.0 });
        assert!(!tr.state().present);
        assert_eq!(tr.velocity(), Vec2::ZERO);
        // Re-entering does not produce a velocity spike from the old anchor.
        tr.handle(&mv(500.0, 0.0, 30.0));
        assert_eq!(tr.velocity(), Vec2::ZERO);
    }
}
