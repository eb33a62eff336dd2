//! Boss lifecycle and level progression
//!
//! Dormant -> Incoming -> Active -> Defeated -> (next level | mission
//! complete | endless restart). Every timed step goes through the session
//! scheduler and re-checks that the session is still playing before acting.

use glam::Vec3;

use super::state::{
    BossPhase, BossVitals, Entity, EntityKind, GameEvent, GamePhase, GameState, RemovalReason,
    Tone,
};
use super::slice::SliceEvent;
use super::tick::{add_score, end};
use crate::audio::SoundCue;

/// Deferred work owned by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Register chime after every fifth slice
    CheckoutCue,
    /// A sliced entity's visual may be disposed
    DestroyVisual { id: u32 },
    ShowBossWarning,
    SpawnBoss,
    /// Death animation finished
    BossDeathDone,
    /// Explosion-to-message finished
    BossMessageDone,
    NextLevelIntro,
    CountdownTick { remaining: u32 },
    AdvanceLevel,
}

const BOSS_FLASH_COLOR: u32 = 0x330000;

/// Load level `index` into the session's live spawn parameters
pub(crate) fn apply_level(state: &mut GameState, index: usize) {
    state.level_index = index;
    let level = state.tuning.level(index);
    state.spawn_interval = level.spawn_rate;
    state.spawn_timer = 0.0;
    state.points_to_trigger_boss = level.points_to_advance;
    state.level_score = 0;
    state.boss_available = false;
}

fn announce_level(state: &mut GameState, banner: Option<String>) {
    let level = state.level();
    let level_id = level.id;
    let name = level.name.clone();
    let text = banner.unwrap_or_else(|| format!("Level {level_id:02} • {name}"));
    log::info!("Level {level_id} ({name}) started, boss at {} points", state.points_to_trigger_boss);
    state.emit(GameEvent::Banner {
        text,
        duration: 1.6,
    });
    state.emit(GameEvent::LevelStarted { level_id, name });
}

/// Combo the boss trigger waits for on the current level
fn boss_combo_threshold(state: &GameState) -> u32 {
    match state.level().boss_combo {
        0 => state.tuning.boss.combo_threshold,
        n => n,
    }
}

/// Mark the boss available once the level score reaches its threshold
pub fn check_boss_availability(state: &mut GameState) {
    if state.boss_phase != BossPhase::Dormant || state.level_transition {
        return;
    }
    if !state.boss_available && state.level_score >= state.points_to_trigger_boss {
        state.boss_available = true;
        log::debug!(
            "Boss available (level score {}, combo {}/{})",
            state.level_score,
            state.combo,
            boss_combo_threshold(state)
        );
    }
}

/// Trigger the boss if both the score and combo gates are open
pub fn maybe_trigger_boss(state: &mut GameState) -> bool {
    if state.boss_available && state.combo >= boss_combo_threshold(state) {
        return trigger_boss(state);
    }
    false
}

/// Start the boss warning sequence: clear the field, block spawns
pub fn trigger_boss(state: &mut GameState) -> bool {
    if !state.is_playing() || !state.boss_available || state.boss_phase != BossPhase::Dormant {
        return false;
    }
    state.boss_phase = BossPhase::Incoming;
    state.clear_entities(|e| !e.is_boss(), RemovalReason::Cleared);
    state.break_combo();

    state.emit(GameEvent::BossAtmosphere { active: true });
    state.emit(GameEvent::Flash {
        color: BOSS_FLASH_COLOR,
        intensity: 0.7,
    });

    let boss = &state.tuning.boss;
    let (warning_at, spawn_at) = (
        state.clock + boss.warning_delay as f64,
        state.clock + boss.spawn_delay as f64,
    );
    state.scheduler.schedule(warning_at, Deferred::ShowBossWarning);
    state.scheduler.schedule(spawn_at, Deferred::SpawnBoss);
    log::info!("Boss incoming on level {}", state.level().id);
    true
}

/// Put the level's boss on the field
pub fn spawn_boss(state: &mut GameState) -> Option<u32> {
    if !state.is_playing() {
        return None;
    }
    let level = state.level();
    let health = level.boss_health.max(1);
    let scale = level.boss_scale;
    let color = level.boss_color;
    let hit_cooldown = state.tuning.boss_hit_cooldown(level);

    let id = state.next_entity_id();
    let mut boss = Entity::new(id, EntityKind::Boss, color);
    boss.position = Vec3::ZERO;
    boss.scale = scale;
    boss.boss = Some(BossVitals {
        health,
        max_health: health,
        next_hit_allowed_at: 0.0,
        hit_cooldown,
        float_time: 0.0,
    });
    state.add_entity(boss);

    state.boss_phase = BossPhase::Active;
    state.boss_available = false;
    state.emit(GameEvent::BossHud {
        health,
        max_health: health,
    });
    state.sound(SoundCue::Combo, 1.5);
    log::info!("Boss spawned with {health} health");
    Some(id)
}

/// Apply one blade hit to the boss. Returns whether it landed.
pub fn handle_boss_hit(state: &mut GameState, event: &SliceEvent) -> bool {
    if !state.is_playing() || !state.boss_active() {
        return false;
    }
    let now = state.clock;
    let Some(vitals) = state
        .entity_mut(event.entity_id)
        .and_then(|e| e.boss.as_mut())
    else {
        return false;
    };
    if now < vitals.next_hit_allowed_at {
        return false;
    }
    vitals.next_hit_allowed_at = now + vitals.hit_cooldown as f64;

    state.sound(SoundCue::Slice, 1.2);
    state.emit(GameEvent::ScreenShake {
        intensity: 5.0,
        duration: 0.1,
    });
    state.emit(GameEvent::BossHit {
        id: event.entity_id,
    });

    // Boss points never count toward the next boss
    add_score(state, event.intersection, true);

    let Some(vitals) = state
        .entity_mut(event.entity_id)
        .and_then(|e| e.boss.as_mut())
    else {
        return true;
    };
    vitals.health = vitals.health.saturating_sub(1);
    let (health, max_health) = (vitals.health, vitals.max_health);
    state.emit(GameEvent::BossHud { health, max_health });

    if health == 0 {
        defeat_boss(state, event.entity_id);
    }
    true
}

/// Remove the boss and start the defeat sequence
pub fn defeat_boss(state: &mut GameState, id: u32) {
    if !state.is_playing() {
        return;
    }
    let Some(boss) = state.remove_entity(id, RemovalReason::BossDefeated) else {
        return;
    };
    state.defeated_level = Some(state.level_index);
    state.break_combo();
    // Spawns stay blocked until the next level starts
    state.boss_phase = BossPhase::Defeated;
    state.level_transition = true;

    state.emit(GameEvent::BossDefeated {
        id,
        position: boss.position,
    });
    state.emit(GameEvent::BossHudHidden);
    state.emit(GameEvent::BossAtmosphere { active: false });

    let due = state.clock + state.tuning.boss.death_animation as f64;
    state.scheduler.schedule(due, Deferred::BossDeathDone);
    log::info!("Boss defeated on level {}", state.level().id);
}

fn on_boss_death_done(state: &mut GameState) {
    let reward = state.tuning.boss.reward_time;
    state.time_left += reward;
    state.emit(GameEvent::TimeBonus { seconds: reward });
    state.emit(GameEvent::ScreenShake {
        intensity: 15.0,
        duration: 0.4,
    });
    let duration = state.tuning.boss.explosion_message;
    state.emit(GameEvent::Banner {
        text: "Competition eliminated!".to_string(),
        duration,
    });
    state
        .scheduler
        .schedule(state.clock + duration as f64, Deferred::BossMessageDone);
}

fn defeat_message_event(state: &GameState, duration: f32) -> GameEvent {
    let level = state.tuning.level(state.defeated_level.unwrap_or(state.level_index));
    GameEvent::BossDefeatMessage {
        defeat_message: level.defeat_message.clone(),
        progress_message: level.progress_message.clone(),
        reward_seconds: state.tuning.boss.reward_time,
        duration,
    }
}

fn on_boss_message_done(state: &mut GameState) {
    let defeated_id = state
        .defeated_level
        .map(|index| state.tuning.level(index).id);

    if defeated_id == Some(state.tuning.final_story_level_id) {
        state.phase = GamePhase::MissionComplete;
        state.emit(GameEvent::MissionComplete);
        log::info!("Mission complete with score {}", state.score);
        return;
    }

    let duration = state.tuning.boss.defeat_message_duration;
    let event = defeat_message_event(state, duration);
    state.emit(event);

    if state.tuning.has_level_after(state.level_index) {
        // Next level starts once the message has faded
        let due = state.clock + duration as f64 + 0.3;
        state.scheduler.schedule(due, Deferred::NextLevelIntro);
    } else {
        restart_endless_boss_cycle(state);
    }
}

/// Last level keeps looping: back to regular play with a fresh threshold
fn restart_endless_boss_cycle(state: &mut GameState) {
    state.boss_phase = BossPhase::Dormant;
    state.level_transition = false;
    state.boss_available = false;
    state.level_score = 0;
    state.points_to_trigger_boss = state.level().points_to_advance;
    log::info!("Endless loop continues, next boss at {} points", state.points_to_trigger_boss);
}

fn on_next_level_intro(state: &mut GameState) {
    let next = state.tuning.level(state.level_index + 1);
    let countdown = state.tuning.countdown_duration(next);
    if countdown == 0 {
        advance_level(state);
        return;
    }
    let (level_id, name) = (next.id, next.name.clone());
    let duration = state.tuning.boss.level_intro_duration;

    state.level_transition = true;
    state.spawn_timer = 0.0;
    state.emit(GameEvent::NextLevelIntro {
        level_id,
        name,
        duration,
    });
    state.scheduler.schedule(
        state.clock + duration as f64,
        Deferred::CountdownTick {
            remaining: countdown,
        },
    );
}

fn on_countdown_tick(state: &mut GameState, remaining: u32) {
    state.emit(GameEvent::Countdown { remaining });
    let next = if remaining > 1 {
        Deferred::CountdownTick {
            remaining: remaining - 1,
        }
    } else {
        Deferred::AdvanceLevel
    };
    state.scheduler.schedule(state.clock + 1.0, next);
}

/// Move to the next level (or restart the last one) and resume spawning
pub fn advance_level(state: &mut GameState) {
    state.boss_phase = BossPhase::Dormant;
    state.level_transition = false;
    state.defeated_level = None;

    if state.tuning.has_level_after(state.level_index) {
        apply_level(state, state.level_index + 1);
        announce_level(state, None);
    } else {
        apply_level(state, state.level_index);
        announce_level(state, Some("Max level • Endless Loop".to_string()));
    }
}

/// Mission-complete branch: keep playing in the endless level
pub fn continue_endless(state: &mut GameState) -> bool {
    if state.phase != GamePhase::MissionComplete {
        return false;
    }
    state.phase = GamePhase::Playing;
    state.boss_phase = BossPhase::Dormant;
    state.level_transition = false;
    state.defeated_level = None;

    let index = if state.tuning.has_level_after(state.level_index) {
        state.level_index + 1
    } else {
        state.level_index
    };
    apply_level(state, index);
    state.time_left += state.tuning.boss.endless_bonus_time;
    announce_level(state, Some("Endless Loop".to_string()));
    true
}

/// Mission-complete branch: end the session as a win
pub fn finish_mission(state: &mut GameState) -> bool {
    if state.phase != GamePhase::MissionComplete {
        return false;
    }
    end(state, true);
    true
}

/// Execute a deferred task. Stale work (session no longer playing) is a no-op.
pub fn run_deferred(state: &mut GameState, task: Deferred) {
    if !state.is_playing() {
        log::debug!("Dropping {task:?}: session not playing");
        return;
    }
    match task {
        Deferred::CheckoutCue => state.sound(SoundCue::Checkout, 1.0),
        Deferred::DestroyVisual { id } => state.emit(GameEvent::EntityDestroyed { id }),
        Deferred::ShowBossWarning => {
            if state.boss_incoming() {
                let boss = &state.tuning.boss;
                let duration = boss.spawn_delay - boss.warning_delay;
                state.emit(GameEvent::BossWarning { duration });
                state.message("Competition detected", Tone::Danger, duration);
            }
        }
        Deferred::SpawnBoss => {
            if state.boss_incoming() {
                spawn_boss(state);
            }
        }
        Deferred::BossDeathDone => on_boss_death_done(state),
        Deferred::BossMessageDone => on_boss_message_done(state),
        Deferred::NextLevelIntro => on_next_level_intro(state),
        Deferred::CountdownTick { remaining } => on_countdown_tick(state, remaining),
        Deferred::AdvanceLevel => advance_level(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tick::{TickInput, start, tick};
    use crate::tuning::Tuning;
    use glam::Vec2;

    fn tuning() -> Tuning {
        let mut tuning = Tuning::default();
        for level in &mut tuning.levels {
            level.points_to_advance = 1_000_000;
            level.boss_health = 1;
        }
        tuning
    }

    fn run_for(state: &mut GameState, seconds: f32) {
        let steps = (seconds / 0.05).ceil() as usize;
        for _ in 0..steps {
            tick(state, &TickInput::default(), 0.05);
        }
    }

    fn boss_hit(state: &GameState) -> SliceEvent {
        let boss = state.boss().expect("boss on field");
        SliceEvent {
            entity_id: boss.id,
            kind: EntityKind::Boss,
            world_point: boss.position,
            direction: Vec2::X,
            intersection: Vec2::new(640.0, 360.0),
            distance: 0.0,
        }
    }

    fn playing(tuning: Tuning) -> GameState {
        let mut state = GameState::new(42, tuning);
        start(&mut state, 0);
        state.drain_events();
        state
    }

    #[test]
    fn test_trigger_requires_available() {
        let mut state = playing(tuning());
        assert!(!trigger_boss(&mut state));
        state.boss_available = true;
        assert!(trigger_boss(&mut state));
        assert_eq!(state.boss_phase, BossPhase::Incoming);
        assert!(!trigger_boss(&mut state));
    }

    #[test]
    fn test_boss_spawns_after_warning_sequence() {
        let mut state = playing(tuning());
        state.boss_available = true;
        trigger_boss(&mut state);
        run_for(&mut state, 1.0);
        assert!(state.events().iter().any(|e| matches!(e, GameEvent::BossWarning { .. })));
        assert!(state.boss().is_none());
        assert!(state.entities.is_empty());

        run_for(&mut state, 3.0);
        assert_eq!(state.boss_phase, BossPhase::Active);
        let boss = state.boss().expect("boss spawned");
        assert_eq!(boss.scale, state.tuning.levels[0].boss_scale);
        assert!(!state.boss_available);
    }

    #[test]
    fn test_boss_hit_cooldown() {
        let mut tuning = tuning();
        tuning.levels[0].boss_health = 5;
        let mut state = playing(tuning);
        spawn_boss(&mut state);
        let hit = boss_hit(&state);

        assert!(handle_boss_hit(&mut state, &hit));
        assert!(!handle_boss_hit(&mut state, &hit));
        assert_eq!(state.boss().unwrap().boss.as_ref().unwrap().health, 4);

        run_for(&mut state, 0.6);
        assert!(handle_boss_hit(&mut state, &hit));
        assert_eq!(state.boss().unwrap().boss.as_ref().unwrap().health, 3);
    }

    #[test]
    fn test_restart_after_defeat_discards_pending_advance() {
        let mut state = playing(tuning());
        spawn_boss(&mut state);
        let hit = boss_hit(&state);
        assert!(handle_boss_hit(&mut state, &hit));
        assert!(state.scheduler.pending() > 0);

        start(&mut state, 0);
        assert_eq!(state.scheduler.pending(), 0);
        state.drain_events();

        run_for(&mut state, 17.0);
        let events = state.drain_events();
        assert!(!events.iter().any(|e| matches!(
            e,
            GameEvent::TimeBonus { .. }
                | GameEvent::BossDefeatMessage { .. }
                | GameEvent::NextLevelIntro { .. }
                | GameEvent::Countdown { .. }
        )));
        assert_eq!(state.level_index, 0);
        assert_eq!(state.boss_phase, BossPhase::Dormant);
        assert!(!state.level_transition);
        assert!(state.time_left < state.tuning.duration - 16.0);
    }

    #[test]
    fn test_defeat_advances_to_next_level() {
        let mut state = playing(tuning());
        spawn_boss(&mut state);
        let time_before = state.time_left;
        let hit = boss_hit(&state);
        assert!(handle_boss_hit(&mut state, &hit));

        assert_eq!(state.boss_phase, BossPhase::Defeated);
        assert!(state.level_transition);
        assert!(state.boss().is_none());

        run_for(&mut state, 17.0);
        let events = state.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::BossDefeatMessage { .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::NextLevelIntro { level_id: 2, .. })));
        let countdown: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Countdown { remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(countdown, vec![3, 2, 1]);

        assert_eq!(state.level_index, 1);
        assert_eq!(state.boss_phase, BossPhase::Dormant);
        assert!(!state.level_transition);
        assert_eq!(state.level_score, 0);
        assert_eq!(state.points_to_trigger_boss, state.tuning.levels[1].points_to_advance);
        // Clock stayed frozen through the whole transition, then got the reward
        assert!(state.time_left >= time_before + state.tuning.boss.reward_time - 1.5);
    }

    #[test]
    fn test_final_story_boss_completes_mission() {
        let mut state = playing(tuning());
        apply_level(&mut state, 3);
        spawn_boss(&mut state);
        let hit = boss_hit(&state);
        handle_boss_hit(&mut state, &hit);
        run_for(&mut state, 8.0);
        assert_eq!(state.phase, GamePhase::MissionComplete);

        let time_before = state.time_left;
        assert!(continue_endless(&mut state));
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.level_index, 4);
        assert_eq!(state.time_left, time_before + 5.0);
        assert!(!continue_endless(&mut state));
    }

    #[test]
    fn test_finish_mission_ends_as_win() {
        let mut state = playing(tuning());
        apply_level(&mut state, 3);
        spawn_boss(&mut state);
        let hit = boss_hit(&state);
        handle_boss_hit(&mut state, &hit);
        run_for(&mut state, 8.0);

        assert!(finish_mission(&mut state));
        assert_eq!(state.phase, GamePhase::Ended);
        let report = state.drain_events().into_iter().find_map(|e| match e {
            GameEvent::GameOver(report) => Some(report),
            _ => None,
        });
        let report = report.expect("game over emitted");
        assert!(report.mission_complete);
        assert_eq!(report.level_reached, 4);
    }

    #[test]
    fn test_endless_boss_restarts_cycle() {
        let mut state = playing(tuning());
        apply_level(&mut state, 4);
        spawn_boss(&mut state);
        let hit = boss_hit(&state);
        handle_boss_hit(&mut state, &hit);
        run_for(&mut state, 8.0);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.level_index, 4);
        assert_eq!(state.boss_phase, BossPhase::Dormant);
        assert!(!state.level_transition);
    }

    #[test]
    fn test_deferred_ignored_when_not_playing() {
        let mut state = GameState::new(1, tuning());
        run_deferred(&mut state, Deferred::SpawnBoss);
        run_deferred(&mut state, Deferred::AdvanceLevel);
        assert!(state.entities.is_empty());
        assert_eq!(state.level_index, 0);
    }
}
