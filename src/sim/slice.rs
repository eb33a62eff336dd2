//! Slice detection
//!
//! Tests the newest blade segments against each entity's projected center.
//! Segment distance (not sample distance) matters: pointer samples are
//! sparse relative to blade speed, so a long swipe between two samples must
//! still cut anything the drawn line passed near.

use glam::{Vec2, Vec3};

use super::blade::BladePoint;
use super::projector::{Camera, Viewport, project, unproject_ray};
use super::state::{Entity, EntityKind};
use crate::consts::{SLICE_MIN_SAMPLES, SLICE_RECENT_SAMPLES, SLICE_TOLERANCE_PX};

/// One entity cut by the blade this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceEvent {
    pub entity_id: u32,
    pub kind: EntityKind,
    /// Entity position in world space at detection time
    pub world_point: Vec3,
    /// Normalized screen-space segment direction
    pub direction: Vec2,
    /// Closest point on the segment to the entity (screen space)
    pub intersection: Vec2,
    /// Screen distance between entity and segment
    pub distance: f32,
}

/// Closest point on segment `a`-`b` to `p` and its distance
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> (f32, Vec2) {
    let segment = b - a;
    let len_sq = segment.length_squared();
    if len_sq == 0.0 {
        return (p.distance(a), a);
    }
    let t = ((p - a).dot(segment) / len_sq).clamp(0.0, 1.0);
    let closest = a + segment * t;
    (p.distance(closest), closest)
}

/// Find every live entity the recent blade trail passes through.
///
/// Trails shorter than three samples are ignored. Sliced, hidden, or
/// unprojectable entities are skipped, as are entities projecting outside
/// the viewport. Each entity is reported at most once; the oldest
/// qualifying segment wins. Entities are not mutated.
pub fn check_slice(
    trail: &[BladePoint],
    entities: &[Entity],
    camera: &Camera,
    viewport: Viewport,
) -> Vec<SliceEvent> {
    if trail.len() < SLICE_MIN_SAMPLES {
        return Vec::new();
    }
    let recent = &trail[trail.len().saturating_sub(SLICE_RECENT_SAMPLES)..];

    entities
        .iter()
        .filter(|e| !e.sliced && e.visible)
        .filter_map(|entity| {
            let screen = project(entity.position, camera, viewport)?;
            if !viewport.contains(screen) {
                return None;
            }
            recent.windows(2).find_map(|pair| {
                let (a, b) = (pair[0].position, pair[1].position);
                let (distance, intersection) = point_segment_distance(screen, a, b);
                (distance < SLICE_TOLERANCE_PX).then(|| SliceEvent {
                    entity_id: entity.id,
                    kind: entity.kind,
                    world_point: entity.position,
                    direction: (b - a).normalize_or_zero(),
                    intersection,
                    distance,
                })
            })
        })
        .collect()
}

/// Exact pick under a screen point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub entity_id: u32,
    pub point: Vec3,
    /// Distance from the camera along the ray
    pub distance: f32,
}

/// Nearest live entity whose bounding sphere the pointer ray hits
pub fn raycast_pick(
    screen: Vec2,
    entities: &[Entity],
    camera: &Camera,
    viewport: Viewport,
) -> Option<RayHit> {
    let ray = unproject_ray(screen, camera, viewport)?;
    entities
        .iter()
        .filter(|e| !e.sliced && e.visible)
        .filter_map(|e| {
            let t = ray.intersect_sphere(e.position, e.hit_radius())?;
            Some(RayHit {
                entity_id: e.id,
                point: ray.at(t),
                distance: t,
            })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}
