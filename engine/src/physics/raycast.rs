//! Scene-wide raycasting against enabled colliders
//!
//! The ray is transformed into each collider's local space; only the
//! single closest world-space hit across all colliders is kept. A mesh
//! collider whose asset or BVH is not ready yet is silently skipped for
//! the call — it will be hittable once the load completes.

use crate::assets::MeshAssets;
use crate::core::entity::{Entity, Transform, World};
use crate::physics::collision::{Aabb, Ray};
use crate::physics::components::{Collider, ColliderShape};
use glam::{Mat4, Vec3};

/// Result of a scene raycast: the globally closest hit
#[derive(Debug, Clone, Copy)]
pub struct RaycastResult {
    pub hit: bool,
    /// World-space distance from the ray origin
    pub distance: f32,
    pub position: Vec3,
    pub normal: Vec3,
    pub entity: Option<Entity>,
    /// Sub-mesh index for mesh collider hits
    pub submesh: Option<u32>,
}

impl Default for RaycastResult {
    fn default() -> Self {
        Self {
            hit: false,
            distance: f32::MAX,
            position: Vec3::ZERO,
            normal: Vec3::ZERO,
            entity: None,
            submesh: None,
        }
    }
}

/// Cast one world-space ray against every enabled collider
pub fn raycast_scene(world: &World, assets: &MeshAssets, ray: &Ray) -> RaycastResult {
    let mut result = RaycastResult::default();
    if ray.direction == Vec3::ZERO {
        return result;
    }

    for (entity, (transform, collider)) in world.query::<(&Transform, &Collider)>().iter() {
        if !collider.enabled {
            continue;
        }

        let matrix = transform.to_matrix();
        let inv = matrix.inverse();
        let local_dir = inv.transform_vector3(ray.direction).normalize_or_zero();
        if local_dir == Vec3::ZERO {
            continue;
        }
        let local_ray = Ray {
            origin: inv.transform_point3(ray.origin),
            direction: local_dir,
        };

        match &collider.shape {
            ColliderShape::Box { size } => {
                let bounds = Aabb::new(collider.offset, collider.offset + *size);
                if let Some((t, local_normal)) = ray_aabb_face(&local_ray, &bounds) {
                    record_hit(
                        &mut result,
                        ray,
                        &matrix,
                        &inv,
                        local_ray.at(t),
                        local_normal,
                        entity,
                        None,
                    );
                }
            }
            ColliderShape::Sphere { radius } => {
                if let Some(t) = ray_sphere(&local_ray, collider.offset, *radius) {
                    let local_pos = local_ray.at(t);
                    let local_normal = (local_pos - collider.offset).normalize_or_zero();
                    record_hit(
                        &mut result,
                        ray,
                        &matrix,
                        &inv,
                        local_pos,
                        local_normal,
                        entity,
                        None,
                    );
                }
            }
            ColliderShape::Mesh { model_path, .. } => {
                // Attached tree first, asset cache second; neither ready
                // means the collider is inactive this frame
                let bvh = collider
                    .bvh
                    .clone()
                    .or_else(|| assets.get(model_path).and_then(|asset| asset.bvh.clone()));
                let bvh = match bvh {
                    Some(bvh) => bvh,
                    None => continue,
                };

                if let Some(hit) = bvh.raycast(&local_ray) {
                    record_hit(
                        &mut result,
                        ray,
                        &matrix,
                        &inv,
                        local_ray.at(hit.distance),
                        hit.normal,
                        entity,
                        Some(hit.submesh),
                    );
                }
            }
            ColliderShape::Capsule { .. } => {}
        }
    }

    result
}

/// Keep the hit if it is the closest seen so far, converting position and
/// normal back to world space
#[allow(clippy::too_many_arguments)]
fn record_hit(
    result: &mut RaycastResult,
    ray: &Ray,
    matrix: &Mat4,
    inv: &Mat4,
    local_position: Vec3,
    local_normal: Vec3,
    entity: Entity,
    submesh: Option<u32>,
) {
    let position = matrix.transform_point3(local_position);
    let distance = ray.origin.distance(position);
    if distance >= result.distance {
        return;
    }

    // Inverse-transpose keeps normals correct under non-uniform scale
    let normal = inv
        .transpose()
        .transform_vector3(local_normal)
        .normalize_or_zero();

    *result = RaycastResult {
        hit: true,
        distance,
        position,
        normal,
        entity: Some(entity),
        submesh,
    };
}

/// Robust slab test returning the entry distance and the face normal hit
///
/// Rays starting inside the box report distance zero with a normal
/// opposing the ray.
fn ray_aabb_face(ray: &Ray, aabb: &Aabb) -> Option<(f32, Vec3)> {
    let mut t_min = 0.0_f32;
    let mut t_max = f32::INFINITY;
    let mut entry_axis: Option<usize> = None;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let dir = ray.direction[axis];
        if dir.abs() < 1e-8 {
            if origin < aabb.min[axis] || origin > aabb.max[axis] {
                return None;
            }
        } else {
            let inv = 1.0 / dir;
            let mut t0 = (aabb.min[axis] - origin) * inv;
            let mut t1 = (aabb.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_min {
                t_min = t0;
                entry_axis = Some(axis);
            }
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
    }

    let normal = match entry_axis {
        Some(axis) => {
            let mut normal = Vec3::ZERO;
            normal[axis] = if ray.direction[axis] > 0.0 { -1.0 } else { 1.0 };
            normal
        }
        // Origin inside the box
        None => -ray.direction,
    };

    Some((t_min, normal))
}

/// Analytic ray/sphere intersection; the ray direction must be normalized
fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = 2.0 * oc.dot(ray.direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - 4.0 * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_discriminant = discriminant.sqrt();
    let t1 = (-b - sqrt_discriminant) * 0.5;
    let t2 = (-b + sqrt_discriminant) * 0.5;

    if t1 > 0.0 {
        Some(t1)
    } else if t2 > 0.0 {
        Some(t2)
    } else {
        None
    }
}
