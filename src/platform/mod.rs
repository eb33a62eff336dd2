//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger setup
//! - Frame timing (requestAnimationFrame timestamps on web)
//! - Session seeds

use crate::consts::MAX_FRAME_DT;

/// Install the logger for the current target.
///
/// Web: console backend plus a panic hook that reports to the console.
/// Native: `env_logger`, honoring `RUST_LOG` (defaults to `info`).
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("logger already set: {err}").into());
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    // Tests and embedders may have installed a logger already
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Fresh seed for a new session
pub fn session_seed() -> u64 {
    rand::random()
}

/// Converts absolute frame timestamps (milliseconds) into clamped deltas
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous frame. The first frame after creation or
    /// `reset` yields zero; long stalls are clamped.
    pub fn delta(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        dt.clamp(0.0, MAX_FRAME_DT)
    }

    /// Seconds between the previous frame and an input timestamp on the same
    /// clock, clamped like `delta`. Zero before the first frame.
    pub fn since_last(&self, now_ms: f64) -> f32 {
        match self.last_ms {
            Some(last) => (((now_ms - last) / 1000.0) as f32).clamp(0.0, MAX_FRAME_DT),
            None => 0.0,
        }
    }

    /// Forget the last timestamp (tab hidden, paused)
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clock_deltas() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.delta(1000.0), 0.0);
        assert!((clock.delta(1016.0) - 0.016).abs() < 1e-6);
        // Tab came back after ten seconds
        assert_eq!(clock.delta(11016.0), MAX_FRAME_DT);
        // Timestamps never run backwards into negative time
        assert_eq!(clock.delta(11000.0), 0.0);

        clock.reset();
        assert_eq!(clock.delta(50000.0), 0.0);
    }

    #[test]
    fn test_input_offset_since_frame() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.since_last(500.0), 0.0);
        clock.delta(1000.0);
        assert!((clock.since_last(1008.0) - 0.008).abs() < 1e-6);
        // Event stamped before the frame callback ran
        assert_eq!(clock.since_last(990.0), 0.0);
        assert_eq!(clock.since_last(5000.0), MAX_FRAME_DT);
    }
}
