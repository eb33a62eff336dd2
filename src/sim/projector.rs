//! World-to-screen projection for hit-testing
//!
//! Screen space has its origin at the top-left corner with y growing
//! downward; world space is y-up with the camera looking down -Z.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::consts::{
    CAMERA_DISTANCE, CAMERA_FAR, CAMERA_FOV_Y_DEGREES, CAMERA_NEAR, DEFAULT_VIEWPORT_HEIGHT,
    DEFAULT_VIEWPORT_WIDTH,
};

/// Drawable area in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
    }
}

impl Viewport {
    /// Degenerate sizes are clamped to one pixel
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Edges are inclusive
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }
}

/// Perspective camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view (radians)
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn for_viewport(viewport: Viewport) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, CAMERA_DISTANCE),
            target: Vec3::ZERO,
            fov_y: CAMERA_FOV_Y_DEGREES.to_radians(),
            aspect: viewport.aspect(),
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
        }
    }

    /// Recompute the aspect ratio after a resize
    pub fn resize(&mut self, viewport: Viewport) {
        self.aspect = viewport.aspect();
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Ray in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    /// Distance along the ray to the first hit on a sphere, if any
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let near = -b - sqrt_d;
        if near >= 0.0 {
            return Some(near);
        }
        // Origin inside the sphere
        let far = -b + sqrt_d;
        (far >= 0.0).then_some(far)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Project a world position to screen pixels.
///
/// Returns `None` when the point lies behind the camera or beyond the far
/// plane. The result may still fall outside the viewport; use
/// [`Viewport::contains`] for visibility.
pub fn project(world: Vec3, camera: &Camera, viewport: Viewport) -> Option<Vec2> {
    let clip = camera.view_projection() * world.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    if ndc.z > 1.0 {
        return None;
    }
    Some(Vec2::new(
        (ndc.x * 0.5 + 0.5) * viewport.width,
        (-ndc.y * 0.5 + 0.5) * viewport.height,
    ))
}

/// Ray from the camera through a screen pixel
pub fn unproject_ray(screen: Vec2, camera: &Camera, viewport: Viewport) -> Option<Ray> {
    let ndc_x = screen.x / viewport.width * 2.0 - 1.0;
    let ndc_y = -(screen.y / viewport.height) * 2.0 + 1.0;
    let inverse = camera.view_projection().inverse();

    let near = inverse * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
    let far = inverse * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
    if near.w.abs() <= f32::EPSILON || far.w.abs() <= f32::EPSILON {
        return None;
    }
    let near = near.truncate() / near.w;
    let far = far.truncate() / far.w;
    let direction = (far - near).try_normalize()?;
    Some(Ray {
        origin: near,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Camera, Viewport) {
        let viewport = Viewport::new(1000.0, 800.0);
        (Camera::for_viewport(viewport), viewport)
    }

    #[test]
    fn test_origin_projects_to_center() {
        let (camera, viewport) = setup();
        let screen = project(Vec3::ZERO, &camera, viewport).expect("origin is visible");
        assert!((screen.x - 500.0).abs() < 1e-3);
        assert!((screen.y - 400.0).abs() < 1e-3);
    }

    #[test]
    fn test_behind_camera_is_none() {
        let (camera, viewport) = setup();
        assert!(project(Vec3::new(0.0, 0.0, 20.0), &camera, viewport).is_none());
    }

    #[test]
    fn test_y_axis_flips() {
        let (camera, viewport) = setup();
        let up = project(Vec3::new(0.0, 3.0, 0.0), &camera, viewport).unwrap();
        let right = project(Vec3::new(3.0, 0.0, 0.0), &camera, viewport).unwrap();
        assert!(up.y < 400.0);
        assert!(right.x > 500.0);
    }

    #[test]
    fn test_resize_changes_aspect() {
        let (mut camera, _) = setup();
        let tall = Viewport::new(400.0, 800.0);
        camera.resize(tall);
        assert!((camera.aspect - 0.5).abs() < 1e-6);
        let screen = project(Vec3::ZERO, &camera, tall).unwrap();
        assert!((screen.x - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_unproject_ray_hits_projected_point() {
        let (camera, viewport) = setup();
        let world = Vec3::new(2.0, -1.5, 0.0);
        let screen = project(world, &camera, viewport).unwrap();
        let ray = unproject_ray(screen, &camera, viewport).unwrap();
        let t = ray.intersect_sphere(world, 0.1).expect("ray passes through point");
        assert!(ray.at(t).distance(world) < 0.11);
    }

    #[test]
    fn test_sphere_miss() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::NEG_Z,
        };
        assert!(ray.intersect_sphere(Vec3::new(5.0, 0.0, 0.0), 1.0).is_none());
        assert_eq!(ray.intersect_sphere(Vec3::ZERO, 1.0), Some(9.0));
    }
}
