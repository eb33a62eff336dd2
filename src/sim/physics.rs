//! Kinematics for entities and debris
//!
//! Semi-implicit Euler for everything that falls; bosses follow a scripted
//! sway instead.

use glam::{Vec2, Vec3};
use rand::Rng;

use super::state::{Debris, Entity};
use crate::consts::SPAWN_SPIN;
use crate::tuning::{LevelDef, PhysicsTuning};
use crate::{perpendicular, sample_range};

/// Per-frame motion parameters (level gravity plus the shared ceiling)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub gravity: f32,
    pub max_height: f32,
    pub ceiling_restitution: f32,
}

impl MotionParams {
    pub fn new(level: &LevelDef, physics: &PhysicsTuning) -> Self {
        Self {
            gravity: level.gravity,
            max_height: physics.max_height,
            ceiling_restitution: physics.ceiling_restitution,
        }
    }
}

/// Advance one entity by `dt` seconds
pub fn advance(entity: &mut Entity, dt: f32, params: &MotionParams) {
    if let Some(vitals) = entity.boss.as_mut() {
        vitals.float_time += dt;
        let t = vitals.float_time;
        entity.position = Vec3::new((t * 0.8).sin() * 1.2, (t * 1.3).sin() * 1.3, 0.0);
        entity.rotation.y += dt * 0.4;
        entity.rotation.x = (t * 0.7).sin() * 0.15;
        return;
    }

    entity.velocity.y += params.gravity * dt;

    // Reflect instead of passing the HUD line
    let next_y = entity.position.y + entity.velocity.y * dt;
    if next_y >= params.max_height && entity.velocity.y > 0.0 {
        entity.velocity.y = -entity.velocity.y.abs() * params.ceiling_restitution;
    }

    entity.position += entity.velocity * dt;
    entity.rotation += entity.angular_velocity * dt;
}

/// Fell below the floor or drifted past the side limits. Bosses never leave.
pub fn is_off_screen(entity: &Entity, bounds: &PhysicsTuning) -> bool {
    if entity.is_boss() {
        return false;
    }
    entity.position.y < bounds.floor_y || entity.position.x.abs() > bounds.lateral_limit
}

/// Age and integrate a fragment. Returns false once it has expired.
pub fn advance_debris(debris: &mut Debris, dt: f32, gravity: f32) -> bool {
    debris.age += dt;
    if debris.age >= debris.lifetime {
        return false;
    }
    debris.velocity.y += gravity * dt;
    debris.position += debris.velocity * dt;
    debris.rotation += debris.angular_velocity * dt;
    true
}

/// Two halves flung apart along the perpendicular of the cut
pub fn split<R: Rng + ?Sized>(
    entity: &Entity,
    direction: Vec2,
    rng: &mut R,
    physics: &PhysicsTuning,
) -> [Debris; 2] {
    // Screen space is y-down; flip into world space before taking the normal
    let world_dir = Vec2::new(direction.x, -direction.y);
    let normal = perpendicular(world_dir).normalize_or_zero().extend(0.0);

    let half = |side: f32, rng: &mut R| Debris {
        source_id: entity.id,
        color: entity.color,
        position: entity.position + normal * physics.debris_offset * side,
        velocity: entity.velocity + normal * physics.debris_separation_speed * side,
        rotation: entity.rotation,
        angular_velocity: Vec3::new(
            (rng.random::<f32>() - 0.5) * 10.0,
            (rng.random::<f32>() - 0.5) * 10.0,
            side * 12.0,
        ),
        age: 0.0,
        lifetime: physics.debris_lifetime,
    };

    let first = half(1.0, rng);
    let second = half(-1.0, rng);
    [first, second]
}

/// Starting kinematics of a freshly spawned entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Vec3,
    pub angular_velocity: Vec3,
}

/// Launch from below the screen at `x` with level-scaled speed
pub fn launch<R: Rng + ?Sized>(
    rng: &mut R,
    x: f32,
    level: &LevelDef,
    physics: &PhysicsTuning,
) -> Launch {
    let vy = sample_range(rng, level.initial_velocity.min, level.initial_velocity.max);
    let vx = sample_range(rng, level.lateral_velocity.min, level.lateral_velocity.max);
    Launch {
        position: Vec3::new(x, physics.spawn_y, 0.0),
        velocity: Vec3::new(vx, vy, 0.0),
        rotation: Vec3::new(
            sample_range(rng, -0.5, 0.5),
            sample_range(rng, -0.5, 0.5),
            sample_range(rng, -std::f32::consts::PI, std::f32::consts::PI),
        ),
        angular_velocity: Vec3::new(
            sample_range(rng, -SPAWN_SPIN, SPAWN_SPIN),
            sample_range(rng, -SPAWN_SPIN, SPAWN_SPIN),
            sample_range(rng, -SPAWN_SPIN, SPAWN_SPIN),
        ),
    }
}

/// Horizontal spawn position. Specials sometimes hide next to a live entity.
pub fn spawn_x<R: Rng + ?Sized>(
    rng: &mut R,
    special: bool,
    neighbours: &[f32],
    physics: &PhysicsTuning,
) -> f32 {
    let range = physics.spawn_x_range;
    if special && !neighbours.is_empty() && rng.random_bool(physics.special_cluster_chance.clamp(0.0, 1.0) as f64) {
        let anchor = neighbours[rng.random_range(0..neighbours.len())];
        let offset = physics.special_cluster_offset;
        return (anchor + sample_range(rng, -offset, offset)).clamp(-range, range);
    }
    sample_range(rng, -range, range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{BossVitals, EntityKind, MachineColor};
    use crate::tuning::Tuning;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn params(gravity: f32) -> MotionParams {
        MotionParams {
            gravity,
            max_height: 7.0,
            ceiling_restitution: 0.5,
        }
    }

    fn entity_at(position: Vec3, velocity: Vec3) -> Entity {
        let mut entity = Entity::new(1, EntityKind::Normal, MachineColor::Blue);
        entity.position = position;
        entity.velocity = velocity;
        entity
    }

    #[test]
    fn test_integrator_identity_without_forces() {
        let start = Vec3::new(1.5, -2.0, 0.0);
        let mut entity = entity_at(start, Vec3::ZERO);
        for _ in 0..600 {
            advance(&mut entity, 1.0 / 60.0, &params(0.0));
        }
        assert_eq!(entity.position, start);
    }

    #[test]
    fn test_gravity_pulls_down() {
        let mut entity = entity_at(Vec3::ZERO, Vec3::ZERO);
        advance(&mut entity, 0.1, &params(-6.5));
        assert!(entity.velocity.y < 0.0);
        assert!(entity.position.y < 0.0);
    }

    #[test]
    fn test_boss_sways_without_gravity() {
        let mut boss = entity_at(Vec3::ZERO, Vec3::new(0.0, 50.0, 0.0));
        boss.kind = EntityKind::Boss;
        boss.boss = Some(BossVitals {
            health: 3,
            max_health: 3,
            next_hit_allowed_at: 0.0,
            hit_cooldown: 0.35,
            float_time: 0.0,
        });
        for _ in 0..1000 {
            advance(&mut boss, 1.0 / 60.0, &params(-20.0));
            assert!(boss.position.x.abs() <= 1.2 + 1e-4);
            assert!(boss.position.y.abs() <= 1.3 + 1e-4);
        }
        assert!(!is_off_screen(&boss, &PhysicsTuning::default()));
    }

    #[test]
    fn test_off_screen_bounds() {
        let bounds = PhysicsTuning::default();
        assert!(is_off_screen(&entity_at(Vec3::new(0.0, -12.5, 0.0), Vec3::ZERO), &bounds));
        assert!(is_off_screen(&entity_at(Vec3::new(15.5, 0.0, 0.0), Vec3::ZERO), &bounds));
        assert!(!is_off_screen(&entity_at(Vec3::new(0.0, -10.0, 0.0), Vec3::ZERO), &bounds));
    }

    #[test]
    fn test_debris_expires_by_age() {
        let physics = PhysicsTuning::default();
        let entity = entity_at(Vec3::ZERO, Vec3::ZERO);
        let mut rng = Pcg32::seed_from_u64(3);
        let [mut a, b] = split(&entity, Vec2::X, &mut rng, &physics);
        assert!(a.position.distance(b.position) > 0.9);
        assert!(a.velocity.dot(b.velocity) < 0.0);

        let mut frames = 0;
        while advance_debris(&mut a, 1.0 / 60.0, physics.debris_gravity) {
            frames += 1;
        }
        assert!((29..=30).contains(&frames));
    }

    #[test]
    fn test_launch_spin_bounded() {
        let tuning = Tuning::default();
        let level = &tuning.levels[0];
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..200 {
            let launch = launch(&mut rng, 0.0, level, &tuning.physics);
            assert!(launch.angular_velocity.abs().max_element() <= SPAWN_SPIN);
            assert!(launch.velocity.y >= level.initial_velocity.min);
            assert_eq!(launch.position.y, tuning.physics.spawn_y);
        }
    }

    #[test]
    fn test_special_spawn_stays_in_range() {
        let physics = PhysicsTuning::default();
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..500 {
            let x = spawn_x(&mut rng, true, &[5.9, -5.9], &physics);
            assert!(x.abs() <= physics.spawn_x_range);
        }
    }

    proptest! {
        #[test]
        fn prop_ceiling_bounce_damps(vy in 1.0f32..40.0, gravity in -9.0f32..-5.0) {
            let mut entity = entity_at(Vec3::new(0.0, 6.999, 0.0), Vec3::new(0.0, vy, 0.0));
            advance(&mut entity, 1.0 / 60.0, &params(gravity));
            prop_assert!(entity.velocity.y < 0.0);
            prop_assert!(entity.velocity.y.abs() < vy);
        }
    }
}
