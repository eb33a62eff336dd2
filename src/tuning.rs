//! Data-driven game balance
//!
//! The level table and every gameplay constant live here as an immutable
//! value. Per-level settings are looked up by index and threaded into the
//! simulation; nothing rewrites them at runtime.

use serde::{Deserialize, Serialize};

use crate::sim::state::MachineColor;

/// Inclusive-exclusive sampling range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// One designed level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub id: u32,
    pub name: String,
    /// Seconds between spawns at level start
    pub spawn_rate: f32,
    /// Floor the spawn interval ramps down to
    pub spawn_rate_min: f32,
    /// Interval reduction after each spawn
    pub spawn_rate_decrease: f32,
    pub gravity: f32,
    pub initial_velocity: Span,
    pub lateral_velocity: Span,
    pub boss_color: MachineColor,
    pub boss_health: u32,
    pub boss_scale: f32,
    /// Live combo needed (together with `points_to_advance`) to trigger the boss
    pub boss_combo: u32,
    /// Per-level override of the boss hit cooldown (seconds)
    #[serde(default)]
    pub boss_hit_cooldown: Option<f32>,
    /// Per-level override of the pre-level countdown (seconds)
    #[serde(default)]
    pub countdown_duration: Option<u32>,
    /// Level score that makes the boss available
    pub points_to_advance: u64,
    /// Probability that a spawn is a do-not-slice entity
    pub special_chance: f32,
    #[serde(default)]
    pub defeat_message: String,
    #[serde(default)]
    pub progress_message: String,
}

impl LevelDef {
    /// Baseline level used when the table is empty or an index is missing
    pub fn fallback() -> Self {
        Self {
            id: 1,
            name: "Baseline".to_string(),
            spawn_rate: 0.9,
            spawn_rate_min: 0.65,
            spawn_rate_decrease: 0.012,
            gravity: -6.5,
            initial_velocity: Span::new(14.0, 18.0),
            lateral_velocity: Span::new(-1.8, 1.8),
            boss_color: MachineColor::Yellow,
            boss_health: 3,
            boss_scale: 1.4,
            boss_combo: 5,
            boss_hit_cooldown: None,
            countdown_duration: None,
            points_to_advance: 350,
            special_chance: 0.15,
            defeat_message: String::new(),
            progress_message: String::new(),
        }
    }
}

/// Score and combo rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTuning {
    pub points_per_slice: u32,
    pub combo_multiplier: f32,
    /// Seconds a combo survives without another slice
    pub combo_timeout: f32,
}

impl Default for ScoringTuning {
    fn default() -> Self {
        Self {
            points_per_slice: 10,
            combo_multiplier: 1.5,
            combo_timeout: 1.5,
        }
    }
}

/// Time bonus for clean streaks of normal slices
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusTuning {
    pub streak_length: u32,
    pub bonus_seconds: f32,
}

impl Default for BonusTuning {
    fn default() -> Self {
        Self {
            streak_length: 5,
            bonus_seconds: 5.0,
        }
    }
}

/// Boss encounter timing and rewards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    pub combo_threshold: u32,
    pub reward_time: f32,
    /// Seconds between accepted hits on the same boss
    pub hit_cooldown: f32,
    pub countdown_duration: u32,
    pub warning_delay: f32,
    pub spawn_delay: f32,
    pub death_animation: f32,
    pub explosion_message: f32,
    pub defeat_message_duration: f32,
    pub level_intro_duration: f32,
    /// Time the endless-loop continuation adds to the clock
    pub endless_bonus_time: f32,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            combo_threshold: 5,
            reward_time: 4.0,
            hit_cooldown: 0.35,
            countdown_duration: 3,
            warning_delay: 0.5,
            spawn_delay: 3.5,
            death_animation: 3.5,
            explosion_message: 3.5,
            defeat_message_duration: 3.0,
            level_intro_duration: 2.5,
            endless_bonus_time: 5.0,
        }
    }
}

/// Kinematic limits shared by every level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Ceiling below the score overlay
    pub max_height: f32,
    /// Fraction of upward speed kept after a ceiling bounce
    pub ceiling_restitution: f32,
    pub spawn_y: f32,
    pub spawn_x_range: f32,
    /// Special entities spawn this close to an existing entity
    pub special_cluster_offset: f32,
    pub special_cluster_chance: f32,
    pub floor_y: f32,
    pub lateral_limit: f32,
    pub debris_lifetime: f32,
    pub debris_gravity: f32,
    pub debris_separation_speed: f32,
    pub debris_offset: f32,
    /// Delay before a sliced entity's visual is destroyed
    pub vanish_delay: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            max_height: 7.0,
            ceiling_restitution: 0.5,
            spawn_y: -10.0,
            spawn_x_range: 6.0,
            special_cluster_offset: 1.5,
            special_cluster_chance: 0.4,
            floor_y: -12.0,
            lateral_limit: 15.0,
            debris_lifetime: 0.5,
            debris_gravity: -6.5,
            debris_separation_speed: 8.0,
            debris_offset: 0.5,
            vanish_delay: 0.05,
        }
    }
}

/// Complete balance table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Starting clock (seconds)
    pub duration: f32,
    pub lives: u8,
    /// Defeating this level's boss completes the story
    pub final_story_level_id: u32,
    pub scoring: ScoringTuning,
    pub bonus: BonusTuning,
    pub boss: BossTuning,
    pub physics: PhysicsTuning,
    pub levels: Vec<LevelDef>,
    #[serde(skip, default = "LevelDef::fallback")]
    fallback_level: LevelDef,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            duration: 20.0,
            lives: 3,
            final_story_level_id: 4,
            scoring: ScoringTuning::default(),
            bonus: BonusTuning::default(),
            boss: BossTuning::default(),
            physics: PhysicsTuning::default(),
            levels: default_levels(),
            fallback_level: LevelDef::fallback(),
        }
    }
}

impl Tuning {
    /// Parse a tuning table from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse JSON if given, otherwise (or on error) use the built-in table
    pub fn load_or_default(json: Option<&str>) -> Self {
        let Some(json) = json else {
            return Self::default();
        };
        match Self::from_json(json) {
            Ok(tuning) => {
                if tuning.levels.is_empty() {
                    log::warn!("Tuning has no levels, using baseline level");
                }
                tuning
            }
            Err(err) => {
                log::warn!("Invalid tuning JSON ({err}), using defaults");
                Self::default()
            }
        }
    }

    /// Level definition for an index, falling back to the baseline level
    pub fn level(&self, index: usize) -> &LevelDef {
        self.levels.get(index).unwrap_or(&self.fallback_level)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn has_level_after(&self, index: usize) -> bool {
        index + 1 < self.levels.len()
    }

    /// Boss hit cooldown for a level (level override, then global default)
    pub fn boss_hit_cooldown(&self, level: &LevelDef) -> f32 {
        level.boss_hit_cooldown.unwrap_or(self.boss.hit_cooldown)
    }

    /// Countdown length before a level starts
    pub fn countdown_duration(&self, level: &LevelDef) -> u32 {
        level
            .countdown_duration
            .unwrap_or(self.boss.countdown_duration)
    }
}

#[allow(clippy::too_many_arguments)]
fn level(
    id: u32,
    name: &str,
    spawn: (f32, f32, f32),
    gravity: f32,
    initial_velocity: Span,
    lateral: f32,
    boss: (MachineColor, u32, f32),
    points_to_advance: u64,
    special_chance: f32,
    defeat_message: &str,
    progress_message: &str,
) -> LevelDef {
    LevelDef {
        id,
        name: name.to_string(),
        spawn_rate: spawn.0,
        spawn_rate_min: spawn.1,
        spawn_rate_decrease: spawn.2,
        gravity,
        initial_velocity,
        lateral_velocity: Span::new(-lateral, lateral),
        boss_color: boss.0,
        boss_health: boss.1,
        boss_scale: boss.2,
        boss_combo: 5,
        boss_hit_cooldown: None,
        countdown_duration: None,
        points_to_advance,
        special_chance,
        defeat_message: defeat_message.to_string(),
        progress_message: progress_message.to_string(),
    }
}

/// The designed campaign: four story levels and the endless loop
pub fn default_levels() -> Vec<LevelDef> {
    vec![
        level(
            1,
            "Crescere",
            (0.95, 0.70, 0.008),
            -6.2,
            Span::new(12.0, 15.0),
            1.4,
            (MachineColor::Yellow, 10, 2.0),
            500,
            0.15,
            "You opened the way to smarter fees.",
            "Your business already feels the difference!",
        ),
        level(
            2,
            "Novus",
            (0.85, 0.55, 0.010),
            -6.5,
            Span::new(13.0, 17.0),
            1.8,
            (MachineColor::Green, 14, 2.2),
            800,
            0.20,
            "Confusing competition, clean fees for you.",
            "Every strike knocks down needless costs.",
        ),
        level(
            3,
            "Magnus",
            (0.70, 0.45, 0.012),
            -7.0,
            Span::new(14.0, 19.0),
            2.2,
            (MachineColor::Orange, 18, 2.4),
            1200,
            0.25,
            "The high-fee giants felt the blow.",
            "You are very close to zero waste.",
        ),
        level(
            4,
            "Optimus",
            (0.60, 0.38, 0.015),
            -7.5,
            Span::new(15.0, 21.0),
            2.5,
            (MachineColor::Cyan, 22, 2.6),
            1800,
            0.30,
            "You took over the competition's premium market.",
            "Almost there: abusive fees are on their way out!",
        ),
        level(
            5,
            "Endless Loop",
            (0.40, 0.22, 0.025),
            -8.5,
            Span::new(17.0, 25.0),
            3.2,
            (MachineColor::Orange, 30, 2.8),
            2500,
            0.38,
            "Impossible! You are unstoppable!",
            "Keep stacking points!",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_matches_campaign() {
        let tuning = Tuning::default();
        assert_eq!(tuning.level_count(), 5);
        assert_eq!(tuning.level(0).name, "Crescere");
        assert_eq!(tuning.level(3).id, tuning.final_story_level_id);
        assert!(tuning.has_level_after(3));
        assert!(!tuning.has_level_after(4));
    }

    #[test]
    fn test_missing_level_falls_back() {
        let tuning = Tuning::default();
        let level = tuning.level(99);
        assert_eq!(level, &LevelDef::fallback());
        assert!(level.gravity < 0.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "duration": 45.0, "scoring": { "points_per_slice": 20 } }"#)
            .expect("valid json");
        assert_eq!(tuning.duration, 45.0);
        assert_eq!(tuning.scoring.points_per_slice, 20);
        assert_eq!(tuning.scoring.combo_multiplier, 1.5);
        assert_eq!(tuning.level_count(), 5);
    }

    #[test]
    fn test_invalid_json_uses_defaults() {
        let tuning = Tuning::load_or_default(Some("{ not json"));
        assert_eq!(tuning.duration, 20.0);
        assert_eq!(tuning.level_count(), 5);
    }

    #[test]
    fn test_level_overrides() {
        let mut tuning = Tuning::default();
        tuning.levels[0].boss_hit_cooldown = Some(0.5);
        assert_eq!(tuning.boss_hit_cooldown(tuning.level(0)), 0.5);
        assert_eq!(tuning.boss_hit_cooldown(tuning.level(1)), 0.35);
        assert_eq!(tuning.countdown_duration(tuning.level(1)), 3);
    }
}
