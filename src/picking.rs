//! Ray picking: the shared raycast primitive behind every picking demo.
//!
//! An NDC point is unprojected through the camera's inverse view-projection
//! into a world-space [`Ray`], which is then intersected against every scene
//! node carrying a [`Collider`]. Hits come back nearest-first.
//!
//! # Example
//!
//! ```
//! use vitrine::*;
//!
//! let mut scene = SceneGraph::new();
//! let cube = scene.add_mesh("cube", Transform::new(), None);
//! scene.attach_collider(cube, Collider::box_collider(Vec3::ONE));
//!
//! let camera = Camera::from_spec(
//!     CameraSpec::Perspective {
//!         fov_y: 45.0,
//!         aspect: None,
//!         near: 0.1,
//!         far: 100.0,
//!         position: Vec3::new(0.0, 0.0, 10.0),
//!         look_at: Vec3::ZERO,
//!     },
//!     4.0 / 3.0,
//! )
//! .unwrap();
//!
//! let hits = pick(Vec2::ZERO, &camera, &scene);
//! assert_eq!(hits[0].node, cube);
//! ```

use glam::{Vec2, Vec3, Vec4};
use hecs::Entity;

use crate::camera::{Camera, Projection};
use crate::scene::{SceneGraph, Transform};

/// A world-space ray with origin and normalized direction.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray; the direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Unproject an NDC point through the camera into a picking ray.
    ///
    /// The near and far clip points (wgpu depth 0 and 1) are unprojected
    /// through the inverse view-projection to fix the ray's direction.
    /// Perspective rays originate at the camera position, so hit distances
    /// measure from the eye; orthographic rays are parallel and originate on
    /// the near plane.
    pub fn from_ndc(ndc: Vec2, camera: &Camera) -> Self {
        let inv = (camera.projection_matrix() * camera.view_matrix()).inverse();

        let near = inv * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inv * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;

        let origin = match camera.projection() {
            Projection::Perspective { .. } => camera.position,
            Projection::Orthographic { .. } => near,
        };
        Self::new(origin, far - near)
    }

    /// The point `t` units along the ray.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test against an axis-aligned box. Returns the nearest positive
    /// hit distance, or `None`.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];

            if dir.abs() < f32::EPSILON {
                // Parallel to this slab; must already be inside it.
                if origin < min[axis] || origin > max[axis] {
                    return None;
                }
            } else {
                let inv_dir = 1.0 / dir;
                let mut t1 = (min[axis] - origin) * inv_dir;
                let mut t2 = (max[axis] - origin) * inv_dir;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }

    /// Quadratic test against a sphere. Returns the nearest positive hit
    /// distance, or `None`.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let a = self.direction.dot(self.direction);
        let b = 2.0 * oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);
        if t1 > 0.0 {
            Some(t1)
        } else if t2 > 0.0 {
            Some(t2)
        } else {
            None
        }
    }
}

/// Collision shape attached to a scene node for picking.
///
/// Colliders are deliberately coarse (box or sphere); they are cheap to test
/// and sufficient for hover/click picking in demo pages.
#[derive(Clone, Copy, Debug)]
pub enum Collider {
    /// Axis-aligned box given by half-extents around the node origin.
    Box { half_extents: Vec3 },
    /// Sphere given by radius around the node origin.
    Sphere { radius: f32 },
}

impl Collider {
    /// Box collider from full dimensions.
    pub fn box_collider(size: Vec3) -> Self {
        Self::Box {
            half_extents: size * 0.5,
        }
    }

    /// Sphere collider with the given radius.
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Test the ray against this collider placed at a world transform.
    ///
    /// Box colliders stay axis-aligned (rotation is ignored); sphere radii
    /// scale by the average of the three axes.
    pub fn intersect(&self, ray: &Ray, world: &Transform) -> Option<f32> {
        match *self {
            Collider::Box { half_extents } => {
                let scaled = half_extents * world.scale;
                ray.intersect_aabb(world.position - scaled, world.position + scaled)
            }
            Collider::Sphere { radius } => {
                let avg = (world.scale.x + world.scale.y + world.scale.z) / 3.0;
                ray.intersect_sphere(world.position, radius * avg)
            }
        }
    }
}

/// One ray-collider intersection.
#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    /// The scene node that was hit.
    pub node: Entity,
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
}

/// Cast a picking ray from an NDC point and collect all hits, nearest first.
///
/// Colliders are tested at their composed world transform, so parented nodes
/// pick correctly. Returns an empty vector when the ray intersects nothing.
pub fn pick(ndc: Vec2, camera: &Camera, scene: &SceneGraph) -> Vec<RayHit> {
    let ray = Ray::from_ndc(ndc, camera);
    pick_with_ray(&ray, scene)
}

/// Collect all hits for a prebuilt ray, nearest first.
pub fn pick_with_ray(ray: &Ray, scene: &SceneGraph) -> Vec<RayHit> {
    let mut hits = Vec::new();
    for (entity, (_, collider)) in scene.world().query::<(&Transform, &Collider)>().iter() {
        let world = scene.world_transform(entity);
        if let Some(distance) = collider.intersect(ray, &world) {
            hits.push(RayHit {
                node: entity,
                distance,
                point: ray.point_at(distance),
            });
        }
    }
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}
