//! Frame-driven simulation tick
//!
//! Core game loop: session clock, combo decay, spawning, motion and
//! deferred work. Pointer input is applied as it arrives so slices resolve
//! against the entities the player actually sees.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::physics::{self, MotionParams};
use super::progression::{self, Deferred, apply_level, check_boss_availability, maybe_trigger_boss};
use super::projector::Viewport;
use super::scoring::{combo_points, slice_pitch};
use super::slice::{SliceEvent, check_slice};
use super::state::{
    BossPhase, Entity, EntityKind, GameEvent, GameOverReport, GamePhase, GameState, MachineColor,
    RemovalReason, Tone,
};
use crate::audio::SoundCue;
use crate::consts::{CHECKOUT_CUE_DELAY, MAX_FRAME_DT};

/// Pointer gesture sample in screen pixels, stamped with its arrival
/// time on the session clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Vec2, time: f64 },
    Move { position: Vec2, time: f64 },
    Up,
}

/// Input gathered for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer samples since the last frame, in arrival order
    pub pointer: Vec<PointerEvent>,
    /// Pause toggle
    pub pause: bool,
}

/// Begin a fresh session on level 1
pub fn start(state: &mut GameState, best_score: u64) {
    reset(state);
    state.best_score = best_score;
    state.phase = GamePhase::Playing;
    check_boss_availability(state);

    let level = state.level();
    let (level_id, name) = (level.id, level.name.clone());
    state.emit(GameEvent::Banner {
        text: format!("Level {level_id:02} • {name}"),
        duration: 1.6,
    });
    state.emit(GameEvent::LevelStarted { level_id, name });
    log::info!("Session started (seed {}, best {best_score})", state.seed);
}

/// Back to the menu with every counter at its starting value.
/// Deferred work from the previous session can never fire afterwards.
pub fn reset(state: &mut GameState) {
    state.scheduler.cancel_all();
    state.blade.reset();
    if state.boss_active() {
        state.emit(GameEvent::BossHudHidden);
    }
    if state.boss_phase != BossPhase::Dormant {
        state.emit(GameEvent::BossAtmosphere { active: false });
    }
    state.clear_entities(|_| true, RemovalReason::Cleared);
    state.debris.clear();

    let tuning = &state.tuning;
    state.lives = tuning.lives;
    state.max_lives = tuning.lives;
    state.time_left = tuning.duration;

    state.phase = GamePhase::Menu;
    state.clock = 0.0;
    state.score = 0;
    state.combo = 0;
    state.combo_timer = 0.0;
    state.max_combo = 0;
    state.total_slices = 0;
    state.clean_streak = 0;
    state.bonuses_earned = 0;
    state.boss_phase = BossPhase::Dormant;
    state.defeated_level = None;
    state.level_transition = false;
    apply_level(state, 0);
}

/// Freeze the session and emit the final report
pub fn end(state: &mut GameState, mission_complete: bool) {
    if matches!(state.phase, GamePhase::Menu | GamePhase::Ended) {
        return;
    }
    state.phase = GamePhase::Ended;
    state.scheduler.cancel_all();

    if state.boss_active() {
        state.emit(GameEvent::BossHudHidden);
    }
    if state.boss_phase != BossPhase::Dormant {
        state.emit(GameEvent::BossAtmosphere { active: false });
    }
    state.boss_phase = BossPhase::Dormant;
    state.level_transition = false;
    state.clear_entities(|_| true, RemovalReason::Cleared);
    state.blade.reset();
    state.sound(SoundCue::GameOver, 1.0);

    let report = GameOverReport {
        score: state.score,
        max_combo: state.max_combo,
        total_slices: state.total_slices,
        is_new_record: state.score > state.best_score,
        mission_complete,
        level_reached: state.level_index as u32 + 1,
    };
    log::info!(
        "Session ended: score {}, max combo {}, {} slices{}",
        report.score,
        report.max_combo,
        report.total_slices,
        if mission_complete { " (mission complete)" } else { "" }
    );
    state.emit(GameEvent::GameOver(report));
}

pub fn pause(state: &mut GameState) -> bool {
    if state.phase != GamePhase::Playing {
        return false;
    }
    state.phase = GamePhase::Paused;
    state.blade.reset();
    true
}

pub fn resume(state: &mut GameState) -> bool {
    if state.phase != GamePhase::Paused {
        return false;
    }
    state.phase = GamePhase::Playing;
    true
}

/// New canvas size; the camera aspect follows the viewport
pub fn resize(state: &mut GameState, width: f32, height: f32) {
    state.viewport = Viewport::new(width, height);
    state.camera.resize(state.viewport);
}

/// Advance the game state by one frame
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                pause(state);
                return;
            }
            GamePhase::Paused => {
                resume(state);
            }
            _ => {}
        }
    }

    for &event in &input.pointer {
        handle_pointer(state, event);
    }

    if !state.is_playing() {
        return;
    }
    let dt = if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DT)
    } else {
        0.0
    };
    state.clock += dt as f64;

    for task in state.scheduler.drain_due(state.clock) {
        progression::run_deferred(state, task);
    }
    if !state.is_playing() {
        return;
    }

    // Clock is frozen while a level intro or boss sequence plays
    if !state.level_transition {
        state.time_left -= dt;
        if state.time_left <= 0.0 {
            state.time_left = 0.0;
            end(state, false);
            return;
        }
    }

    if state.combo > 0 {
        state.combo_timer -= dt;
        if state.combo_timer <= 0.0 {
            state.break_combo();
        }
    }

    if state.spawning_allowed() {
        state.spawn_timer += dt;
        if state.spawn_timer >= state.spawn_interval {
            spawn_entity(state);
            state.spawn_timer = 0.0;
            let level = state.tuning.level(state.level_index);
            state.spawn_interval =
                (state.spawn_interval - level.spawn_rate_decrease).max(level.spawn_rate_min);
        }
    }

    update_entities(state, dt);

    let gravity = state.tuning.physics.debris_gravity;
    state
        .debris
        .retain_mut(|d| physics::advance_debris(d, dt, gravity));

    state.blade.update(state.clock);
}

fn update_entities(state: &mut GameState, dt: f32) {
    let params = MotionParams::new(state.level(), &state.tuning.physics);
    for entity in &mut state.entities {
        physics::advance(entity, dt, &params);
    }

    let missed: Vec<u32> = state
        .entities
        .iter()
        .filter(|e| physics::is_off_screen(e, &state.tuning.physics))
        .map(|e| e.id)
        .collect();
    for id in missed {
        state.remove_entity(id, RemovalReason::Missed);
        // Letting anything fall breaks the combo
        state.break_combo();
    }
}

/// Feed one pointer sample to the blade and resolve the slices it causes
pub fn handle_pointer(state: &mut GameState, event: PointerEvent) -> Vec<SliceEvent> {
    if !state.is_playing() {
        return Vec::new();
    }
    match event {
        PointerEvent::Down { position, time } => {
            state.blade.start(position, time);
            Vec::new()
        }
        PointerEvent::Move { position, time } => {
            if !state.blade.is_tracking() {
                return Vec::new();
            }
            state.blade.move_to(position, time);
            let slices = check_slice(
                state.blade.points(),
                &state.entities,
                &state.camera,
                state.viewport,
            );
            slices
                .into_iter()
                .filter(|slice| apply_slice(state, slice))
                .collect()
        }
        PointerEvent::Up => {
            state.blade.stop(state.clock);
            Vec::new()
        }
    }
}

/// Resolve one detected slice. Returns whether it changed the session.
pub fn apply_slice(state: &mut GameState, slice: &SliceEvent) -> bool {
    if !state.is_playing() {
        return false;
    }
    // Gone already (e.g. field cleared for a boss earlier in the gesture)
    let Some(entity) = state.entity(slice.entity_id) else {
        return false;
    };
    if entity.sliced {
        return false;
    }
    let kind = entity.kind;
    match kind {
        EntityKind::Boss => progression::handle_boss_hit(state, slice),
        EntityKind::Special => {
            slice_special(state, slice);
            true
        }
        EntityKind::Normal => {
            slice_normal(state, slice);
            true
        }
    }
}

fn slice_normal(state: &mut GameState, slice: &SliceEvent) {
    let id = slice.entity_id;
    if let Some(entity) = state.entity_mut(id) {
        entity.sliced = true;
    }
    state.total_slices += 1;
    state.clean_streak += 1;

    let bonus = &state.tuning.bonus;
    if bonus.streak_length > 0 && state.clean_streak >= bonus.streak_length {
        let seconds = bonus.bonus_seconds;
        state.time_left += seconds;
        state.bonuses_earned += 1;
        state.clean_streak = 0;
        state.emit(GameEvent::TimeBonus { seconds });
        state.message(format!("+{seconds:.0} seconds!"), Tone::Reward, 1.2);
        state.sound(SoundCue::Checkout, 1.0);
    }

    let Some(entity) = state.remove_entity(id, RemovalReason::Sliced) else {
        return;
    };
    let halves = physics::split(
        &entity,
        slice.direction,
        &mut state.rng,
        &state.tuning.physics,
    );
    state.debris.extend(halves);
    state.emit(GameEvent::EntitySliced {
        id,
        point: slice.world_point,
        direction: slice.direction,
    });

    // Pitch follows the combo this slice extends
    state.sound(SoundCue::Slice, slice_pitch(state.combo));
    if state.total_slices % 5 == 0 {
        let due = state.clock + CHECKOUT_CUE_DELAY as f64;
        state.scheduler.schedule(due, Deferred::CheckoutCue);
    }

    add_score(state, slice.intersection, false);

    let vanish_at = state.clock + state.tuning.physics.vanish_delay as f64;
    state
        .scheduler
        .schedule(vanish_at, Deferred::DestroyVisual { id });
}

fn slice_special(state: &mut GameState, slice: &SliceEvent) {
    let last_life = state.lives <= 1;
    if let Some(entity) = state.entity_mut(slice.entity_id) {
        entity.sliced = true;
    }
    state.clean_streak = 0;
    state.break_combo();
    let cue = if last_life {
        SoundCue::GameOver
    } else {
        SoundCue::Ui
    };
    state.sound(cue, 1.0);
    state.remove_entity(slice.entity_id, RemovalReason::Sliced);
    state.emit(GameEvent::ScreenShake {
        intensity: 8.0,
        duration: 0.2,
    });

    if last_life {
        state.lives = 0;
        state.message("System down!", Tone::Danger, 2.0);
        state.time_left = 0.0;
        end(state, false);
        return;
    }

    state.lives -= 1;
    let text = format!(
        "Don't slice the lime ones! ({}/{})",
        state.lives, state.max_lives
    );
    state.message(text, Tone::Danger, 1.5);
}

/// Extend the combo and bank the points for one hit.
///
/// Boss hits pay out like any slice but never count toward the next boss.
pub(crate) fn add_score(state: &mut GameState, screen: Vec2, boss_hit: bool) -> u64 {
    state.combo += 1;
    state.max_combo = state.max_combo.max(state.combo);
    state.combo_timer = state.tuning.scoring.combo_timeout;

    let scoring = &state.tuning.scoring;
    let points = combo_points(
        scoring.points_per_slice,
        state.combo,
        scoring.combo_multiplier,
    );
    if state.combo > 1 {
        state.sound(SoundCue::Combo, state.combo as f32);
    }

    state.score += points;
    if !boss_hit {
        state.level_score += points;
    }
    check_boss_availability(state);
    maybe_trigger_boss(state);

    state.emit(GameEvent::ScorePopup { screen, points });
    points
}

/// Launch one normal or special entity from below the screen
pub fn spawn_entity(state: &mut GameState) -> Option<u32> {
    if !state.is_playing() || !state.spawning_allowed() {
        return None;
    }
    let level = state.tuning.level(state.level_index);
    let special = state
        .rng
        .random_bool(level.special_chance.clamp(0.0, 1.0) as f64);

    let neighbours: Vec<f32> = state
        .entities
        .iter()
        .filter(|e| !e.is_boss())
        .map(|e| e.position.x)
        .collect();
    let x = physics::spawn_x(&mut state.rng, special, &neighbours, &state.tuning.physics);
    let launch = physics::launch(&mut state.rng, x, level, &state.tuning.physics);

    let (kind, color) = if special {
        (EntityKind::Special, MachineColor::Lime)
    } else {
        let color = MachineColor::PALETTE
            .choose(&mut state.rng)
            .copied()
            .unwrap_or(MachineColor::Yellow);
        (EntityKind::Normal, color)
    };

    let id = state.next_entity_id();
    let mut entity = Entity::new(id, kind, color);
    entity.position = launch.position;
    entity.velocity = launch.velocity;
    entity.rotation = launch.rotation;
    entity.angular_velocity = launch.angular_velocity;
    state.add_entity(entity);
    state.sound(SoundCue::Spawn, 1.0);

    if special {
        state.message("Don't slice the lime ones!", Tone::Caution, 1.5);
    }
    Some(id)
}
