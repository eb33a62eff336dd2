//! Blade gesture tracking
//!
//! Buffers pointer samples into a short trail. Insertion caps the sample
//! count; `update` independently drops samples older than the max age.
//! Timestamps are session-clock seconds.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{BLADE_CLEAR_DELAY, BLADE_MAX_AGE, BLADE_MAX_SAMPLES};

/// One pointer sample in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BladePoint {
    pub position: Vec2,
    pub time: f64,
}

/// Pointer gesture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BladeState {
    #[default]
    Idle,
    Tracking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BladeTrail {
    state: BladeState,
    points: Vec<BladePoint>,
    max_samples: usize,
    max_age: f64,
    clear_delay: f64,
    /// Pending clear after pointer-up
    clear_at: Option<f64>,
}

impl Default for BladeTrail {
    fn default() -> Self {
        Self::with_limits(BLADE_MAX_SAMPLES, BLADE_MAX_AGE, BLADE_CLEAR_DELAY)
    }
}

impl BladeTrail {
    pub fn with_limits(max_samples: usize, max_age: f64, clear_delay: f64) -> Self {
        Self {
            state: BladeState::Idle,
            points: Vec::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            max_age,
            clear_delay,
            clear_at: None,
        }
    }

    /// Begin a gesture, replacing any previous trail
    pub fn start(&mut self, position: Vec2, now: f64) {
        self.state = BladeState::Tracking;
        self.clear_at = None;
        self.points.clear();
        self.points.push(BladePoint {
            position,
            time: now,
        });
    }

    /// Append a sample; oldest samples are evicted past the cap.
    /// A sample stamped before the newest one takes the newest time.
    pub fn move_to(&mut self, position: Vec2, now: f64) {
        if self.state != BladeState::Tracking {
            return;
        }
        let time = self.points.last().map_or(now, |last| now.max(last.time));
        self.points.push(BladePoint { position, time });
        if self.points.len() > self.max_samples {
            let excess = self.points.len() - self.max_samples;
            self.points.drain(..excess);
        }
    }

    /// End the gesture; the trail clears after a short grace delay
    pub fn stop(&mut self, now: f64) {
        if self.state != BladeState::Tracking {
            return;
        }
        self.state = BladeState::Idle;
        self.clear_at = Some(now + self.clear_delay);
    }

    /// Per-frame decay, called regardless of state
    pub fn update(&mut self, now: f64) {
        if self.clear_at.is_some_and(|at| now >= at) {
            self.clear_at = None;
            self.points.clear();
        }
        let max_age = self.max_age;
        self.points.retain(|p| now - p.time < max_age);
    }

    /// Drop everything immediately
    pub fn reset(&mut self) {
        self.state = BladeState::Idle;
        self.clear_at = None;
        self.points.clear();
    }

    pub fn points(&self) -> &[BladePoint] {
        &self.points
    }

    pub fn state(&self) -> BladeState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == BladeState::Tracking
    }

    /// Unit vector from a sample a few steps back to the newest one
    pub fn direction(&self) -> Vec2 {
        let len = self.points.len();
        if len < 2 {
            return Vec2::ZERO;
        }
        let last = self.points[len - 1].position;
        let prev = self.points[len.saturating_sub(3)].position;
        (last - prev).normalize_or_zero()
    }

    /// Pixels per second between the two newest samples
    pub fn speed(&self) -> f32 {
        let len = self.points.len();
        if len < 2 {
            return 0.0;
        }
        let last = self.points[len - 1];
        let prev = self.points[len - 2];
        let dt = last.time - prev.time;
        if dt <= 0.0 {
            return 0.0;
        }
        (last.position.distance(prev.position) as f64 / dt) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_ignored_when_idle() {
        let mut blade = BladeTrail::default();
        blade.move_to(Vec2::new(10.0, 10.0), 0.0);
        assert!(blade.points().is_empty());
        assert!(!blade.is_tracking());
    }

    #[test]
    fn test_trail_capped_oldest_first() {
        let mut blade = BladeTrail::default();
        blade.start(Vec2::ZERO, 0.0);
        for i in 1..=30 {
            blade.move_to(Vec2::new(i as f32, 0.0), 0.0);
        }
        assert_eq!(blade.points().len(), BLADE_MAX_SAMPLES);
        assert_eq!(blade.points()[0].position.x, 11.0);
        assert_eq!(blade.points().last().unwrap().position.x, 30.0);
    }

    #[test]
    fn test_update_drops_old_samples() {
        let mut blade = BladeTrail::default();
        blade.start(Vec2::ZERO, 0.0);
        blade.move_to(Vec2::new(5.0, 0.0), 0.3);
        blade.move_to(Vec2::new(10.0, 0.0), 0.6);
        blade.update(0.6);
        assert_eq!(blade.points().len(), 2);
        blade.update(1.0);
        assert_eq!(blade.points().len(), 1);
        assert!(blade.is_tracking());
    }

    #[test]
    fn test_stop_clears_after_grace_delay() {
        let mut blade = BladeTrail::default();
        blade.start(Vec2::ZERO, 1.0);
        blade.move_to(Vec2::new(5.0, 0.0), 1.0);
        blade.stop(1.0);
        assert!(!blade.is_tracking());
        blade.update(1.05);
        assert_eq!(blade.points().len(), 2);
        blade.update(1.2);
        assert!(blade.points().is_empty());
    }

    #[test]
    fn test_restart_cancels_pending_clear() {
        let mut blade = BladeTrail::default();
        blade.start(Vec2::ZERO, 0.0);
        blade.stop(0.0);
        blade.start(Vec2::new(1.0, 1.0), 0.05);
        blade.update(0.2);
        assert_eq!(blade.points().len(), 1);
    }

    #[test]
    fn test_direction_and_speed() {
        let mut blade = BladeTrail::default();
        assert_eq!(blade.direction(), Vec2::ZERO);
        assert_eq!(blade.speed(), 0.0);

        blade.start(Vec2::ZERO, 0.0);
        blade.move_to(Vec2::new(0.0, 10.0), 0.1);
        blade.move_to(Vec2::new(0.0, 20.0), 0.2);
        assert_eq!(blade.direction(), Vec2::Y);
        assert!((blade.speed() - 100.0).abs() < 1e-3);

        blade.move_to(Vec2::new(0.0, 30.0), 0.2);
        assert_eq!(blade.speed(), 0.0);
    }

    #[test]
    fn test_sample_times_never_run_backwards() {
        let mut blade = BladeTrail::default();
        blade.start(Vec2::ZERO, 1.0);
        blade.move_to(Vec2::new(10.0, 0.0), 0.9);
        assert_eq!(blade.points()[1].time, 1.0);
    }
}
