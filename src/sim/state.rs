//! Game state and core simulation types
//!
//! The session owns every live entity exclusively; collaborators only see
//! ids and the events drained after each frame.

use glam::{Vec2, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::blade::BladeTrail;
use super::progression::Deferred;
use super::projector::{Camera, Viewport};
use super::schedule::Scheduler;
use crate::audio::SoundCue;
use crate::consts::{ENTITY_HIT_RADIUS, ENTITY_SCALE};
use crate::tuning::{LevelDef, Tuning};

/// Cosmetic color tag, rendered by the scene collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineColor {
    Yellow,
    Blue,
    Green,
    Cyan,
    Orange,
    /// Reserved for do-not-slice entities
    Lime,
}

impl MachineColor {
    /// Colors a regular entity can take
    pub const PALETTE: [MachineColor; 5] = [
        MachineColor::Yellow,
        MachineColor::Blue,
        MachineColor::Green,
        MachineColor::Cyan,
        MachineColor::Orange,
    ];
}

/// What slicing an entity means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Slice for points
    Normal,
    /// Must not be sliced; costs a life
    Special,
    /// Takes repeated hits
    Boss,
}

/// Boss-only state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossVitals {
    pub health: u32,
    pub max_health: u32,
    /// Session clock (seconds) before which hits are ignored
    pub next_hit_allowed_at: f64,
    pub hit_cooldown: f32,
    /// Drives the scripted idle sway
    pub float_time: f32,
}

/// A falling slicable object or the boss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: u32,
    pub kind: EntityKind,
    pub color: MachineColor,
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Euler angles (radians)
    pub rotation: Vec3,
    pub scale: f32,
    pub sliced: bool,
    pub visible: bool,
    pub boss: Option<BossVitals>,
}

impl Entity {
    pub fn new(id: u32, kind: EntityKind, color: MachineColor) -> Self {
        Self {
            id,
            kind,
            color,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: ENTITY_SCALE,
            sliced: false,
            visible: true,
            boss: None,
        }
    }

    #[inline]
    pub fn is_boss(&self) -> bool {
        self.kind == EntityKind::Boss
    }

    /// Bounding sphere radius used by the ray picker
    #[inline]
    pub fn hit_radius(&self) -> f32 {
        ENTITY_HIT_RADIUS * self.scale
    }
}

/// Cosmetic half of a sliced entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debris {
    /// Id of the entity it came from
    pub source_id: u32,
    pub color: MachineColor,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Vec3,
    pub angular_velocity: Vec3,
    pub age: f32,
    pub lifetime: f32,
}

/// Top-level session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the start trigger
    Menu,
    /// Active gameplay
    Playing,
    Paused,
    /// Final story boss fell; waiting for continue-or-finish
    MissionComplete,
    /// Session over, report emitted
    Ended,
}

/// Boss lifecycle within a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BossPhase {
    /// Regular spawn-and-slice flow
    #[default]
    Dormant,
    /// Warning sequence running, field cleared, no spawns
    Incoming,
    /// Boss on the field
    Active,
    /// Death sequence running, waiting for the next level
    Defeated,
}

/// Why an entity left the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    Sliced,
    /// Fell or drifted off screen
    Missed,
    /// Field cleared for a boss or session teardown
    Cleared,
    BossDefeated,
}

/// Tone of a transient on-screen message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Info,
    Caution,
    Danger,
    Reward,
}

/// Terminal session report for the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverReport {
    pub score: u64,
    pub max_combo: u32,
    pub total_slices: u32,
    pub is_new_record: bool,
    pub mission_complete: bool,
    pub level_reached: u32,
}

/// Intents emitted by the simulation, consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    Sound { cue: SoundCue, intensity: f32 },
    EntitySpawned { id: u32, kind: EntityKind, color: MachineColor },
    EntityRemoved { id: u32, reason: RemovalReason },
    /// Sliced entity's visual may now be disposed
    EntityDestroyed { id: u32 },
    EntitySliced { id: u32, point: Vec3, direction: Vec2 },
    ScorePopup { screen: Vec2, points: u64 },
    Message { text: String, tone: Tone, duration: f32 },
    Banner { text: String, duration: f32 },
    TimeBonus { seconds: f32 },
    ScreenShake { intensity: f32, duration: f32 },
    Flash { color: u32, intensity: f32 },
    BossAtmosphere { active: bool },
    BossWarning { duration: f32 },
    BossHud { health: u32, max_health: u32 },
    BossHudHidden,
    BossHit { id: u32 },
    BossDefeated { id: u32, position: Vec3 },
    BossDefeatMessage {
        defeat_message: String,
        progress_message: String,
        reward_seconds: f32,
        duration: f32,
    },
    NextLevelIntro { level_id: u32, name: String, duration: f32 },
    Countdown { remaining: u32 },
    LevelStarted { level_id: u32, name: String },
    MissionComplete,
    GameOver(GameOverReport),
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub phase: GamePhase,
    /// Session clock in seconds (advances only while playing)
    pub clock: f64,
    pub score: u64,
    pub combo: u32,
    /// Seconds left before the combo drops
    pub combo_timer: f32,
    pub max_combo: u32,
    pub total_slices: u32,
    /// Consecutive normal slices since the last special slice or bonus
    pub clean_streak: u32,
    pub bonuses_earned: u32,
    pub lives: u8,
    pub max_lives: u8,
    pub time_left: f32,
    pub level_index: usize,
    pub spawn_interval: f32,
    pub spawn_timer: f32,
    /// Points since level start, boss hits excluded
    pub level_score: u64,
    pub points_to_trigger_boss: u64,
    pub boss_phase: BossPhase,
    pub boss_available: bool,
    /// Level whose boss was last defeated (drives the post-defeat branch)
    pub defeated_level: Option<usize>,
    /// Level intro / countdown running: clock frozen, spawns blocked
    pub level_transition: bool,
    /// Stored best score at session start
    pub best_score: u64,
    /// Live entities in spawn order
    pub entities: Vec<Entity>,
    pub debris: Vec<Debris>,
    pub blade: BladeTrail,
    pub camera: Camera,
    pub viewport: Viewport,
    pub scheduler: Scheduler<Deferred>,
    events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a session in the menu phase
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        let viewport = Viewport::default();
        let level = tuning.level(0);
        let spawn_interval = level.spawn_rate;
        let points_to_trigger_boss = level.points_to_advance;
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Menu,
            clock: 0.0,
            score: 0,
            combo: 0,
            combo_timer: 0.0,
            max_combo: 0,
            total_slices: 0,
            clean_streak: 0,
            bonuses_earned: 0,
            lives: tuning.lives,
            max_lives: tuning.lives,
            time_left: tuning.duration,
            level_index: 0,
            spawn_interval,
            spawn_timer: 0.0,
            level_score: 0,
            points_to_trigger_boss,
            boss_phase: BossPhase::Dormant,
            boss_available: false,
            defeated_level: None,
            level_transition: false,
            best_score: 0,
            entities: Vec::new(),
            debris: Vec::new(),
            blade: BladeTrail::default(),
            camera: Camera::for_viewport(viewport),
            viewport,
            scheduler: Scheduler::new(),
            events: Vec::new(),
            next_id: 1,
            tuning,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Definition of the level being played
    pub fn level(&self) -> &LevelDef {
        self.tuning.level(self.level_index)
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    #[inline]
    pub fn boss_active(&self) -> bool {
        self.boss_phase == BossPhase::Active
    }

    #[inline]
    pub fn boss_incoming(&self) -> bool {
        self.boss_phase == BossPhase::Incoming
    }

    /// Normal and special entities may spawn only in the regular flow
    pub fn spawning_allowed(&self) -> bool {
        !self.level_transition && self.boss_phase == BossPhase::Dormant
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: u32) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Current boss, if one is on the field
    pub fn boss(&self) -> Option<&Entity> {
        self.entities.iter().find(|e| e.is_boss())
    }

    /// Insert an entity and announce it
    pub fn add_entity(&mut self, entity: Entity) -> u32 {
        let id = entity.id;
        self.emit(GameEvent::EntitySpawned {
            id,
            kind: entity.kind,
            color: entity.color,
        });
        self.entities.push(entity);
        id
    }

    /// Remove an entity from the live collection
    pub fn remove_entity(&mut self, id: u32, reason: RemovalReason) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id == id)?;
        let entity = self.entities.remove(index);
        self.emit(GameEvent::EntityRemoved { id, reason });
        Some(entity)
    }

    /// Remove every entity matching `filter`
    pub fn clear_entities(&mut self, filter: impl Fn(&Entity) -> bool, reason: RemovalReason) {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.entities).into_iter().partition(|e| filter(e));
        self.entities = kept;
        for entity in removed {
            self.emit(GameEvent::EntityRemoved {
                id: entity.id,
                reason,
            });
        }
    }

    /// Drop combo and its timer
    pub fn break_combo(&mut self) {
        self.combo = 0;
        self.combo_timer = 0.0;
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn sound(&mut self, cue: SoundCue, intensity: f32) {
        self.emit(GameEvent::Sound { cue, intensity });
    }

    pub fn message(&mut self, text: impl Into<String>, tone: Tone, duration: f32) {
        self.emit(GameEvent::Message {
            text: text.into(),
            tone,
            duration,
        });
    }

    /// Events emitted since the last drain
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
