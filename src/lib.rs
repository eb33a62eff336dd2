//! Infinite Slice - a reflex slicing arcade game core
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (physics, blade tracking, slice detection, session state)
//! - `game`: Runtime that wires the simulation to its external services
//! - `services`: Renderer/UI collaborator interface
//! - `audio`: Sound cues and audio backends
//! - `persistence`: Best score storage
//! - `platform`: Browser/native platform abstraction
//! - `tuning`: Data-driven game balance and level table

pub mod audio;
pub mod game;
pub mod persistence;
pub mod platform;
pub mod services;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use game::Game;
pub use settings::Settings;
pub use tuning::{LevelDef, Tuning};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Largest frame delta fed to the simulation (tab switches, debugger stalls)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Default viewport used before the first resize
    pub const DEFAULT_VIEWPORT_WIDTH: f32 = 1280.0;
    pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 720.0;

    /// Camera defaults (perspective, looking down -Z at the play plane)
    pub const CAMERA_FOV_Y_DEGREES: f32 = 75.0;
    pub const CAMERA_DISTANCE: f32 = 10.0;
    pub const CAMERA_NEAR: f32 = 0.1;
    pub const CAMERA_FAR: f32 = 1000.0;

    /// Bounding radius of an unscaled entity (world units)
    pub const ENTITY_HIT_RADIUS: f32 = 1.2;
    /// Visual scale applied to every regular entity
    pub const ENTITY_SCALE: f32 = 1.2;

    /// Blade trail limits
    pub const BLADE_MAX_SAMPLES: usize = 20;
    /// Seconds a sample stays in the trail
    pub const BLADE_MAX_AGE: f64 = 0.5;
    /// Grace period between pointer-up and trail clear (visual fade)
    pub const BLADE_CLEAR_DELAY: f64 = 0.1;

    /// Slice detection
    pub const SLICE_MIN_SAMPLES: usize = 3;
    /// Only the newest samples can slice
    pub const SLICE_RECENT_SAMPLES: usize = 5;
    /// Max screen distance (px) between entity center and blade segment
    pub const SLICE_TOLERANCE_PX: f32 = 60.0;

    /// Spawned entities spin at most this fast on each axis (rad/s)
    pub const SPAWN_SPIN: f32 = 1.5;
    /// Delay of the checkout cue after every fifth slice
    pub const CHECKOUT_CUE_DELAY: f32 = 0.15;
}

/// Vector perpendicular to `v` (rotated 90° counter-clockwise)
#[inline]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Uniform sample from `[min, max)`, tolerating degenerate or inverted ranges
#[inline]
pub fn sample_range<R: rand::Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min {
        rng.random_range(min..max)
    } else {
        min
    }
}
