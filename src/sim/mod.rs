//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Session clock driven by the caller's frame deltas
//! - Seeded RNG only
//! - Entities iterate in spawn order
//! - No rendering, audio or storage dependencies; effects leave as events

pub mod blade;
pub mod physics;
pub mod progression;
pub mod projector;
pub mod schedule;
pub mod scoring;
pub mod slice;
pub mod state;
pub mod tick;

pub use blade::{BladePoint, BladeState, BladeTrail};
pub use progression::Deferred;
pub use projector::{Camera, Ray, Viewport, project, unproject_ray};
pub use schedule::Scheduler;
pub use slice::{RayHit, SliceEvent, check_slice, raycast_pick};
pub use state::{
    BossPhase, Debris, Entity, EntityKind, GameEvent, GameOverReport, GamePhase, GameState,
    MachineColor, RemovalReason, Tone,
};
pub use tick::{PointerEvent, TickInput, tick};
