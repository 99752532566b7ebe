//! Narrow-phase collision resolution
//!
//! Computes a minimum-translation vector between each dynamic body and
//! every other enabled collider, applying position corrections
//! immediately. Bodies are processed in iteration order and each
//! correction feeds into the next test, so resolution is sequential
//! (Gauss–Seidel-like) — a known limitation, not a parallelizable pass.

use crate::core::entity::{Entity, Transform, World};
use crate::physics::collision::bvh::Bvh;
use crate::physics::collision::shapes::{box_world_aabb, capsule_segment, sphere_center};
use crate::physics::collision::Aabb;
use crate::physics::components::{Collider, ColliderShape, RigidBody};
use glam::Vec3;
use std::sync::Arc;

/// Contact normals steeper than this count as ground
const GROUND_NORMAL_Y: f32 = 0.45;
/// Mesh MTVs shallower than this are ignored
const MIN_MESH_DEPTH: f32 = 1e-4;

/// Snapshot of a collider a body can be resolved against this step
struct ColliderSnapshot {
    entity: Entity,
    transform: Transform,
    offset: Vec3,
    shape: ColliderShape,
    bvh: Option<Arc<Bvh>>,
}

/// Resolve every body against the full collider set
///
/// Each body's grounded flag is re-derived from scratch; disabled
/// colliders are skipped entirely.
pub fn resolve_collisions(world: &mut World, bodies: &[Entity]) {
    for &entity in bodies {
        if let Ok(body) = world.query_one_mut::<&mut RigidBody>(entity) {
            body.is_grounded = false;
        }

        let (mut transform, mut body, own_shape, own_offset) =
            match world.query_one_mut::<(&Transform, &RigidBody, &Collider)>(entity) {
                Ok((t, rb, c)) if c.enabled => (*t, rb.clone(), c.shape.clone(), c.offset),
                _ => continue,
            };

        let others: Vec<ColliderSnapshot> = world
            .query::<(&Transform, &Collider)>()
            .iter()
            .filter(|(other, (_, collider))| *other != entity && collider.enabled)
            .map(|(other, (t, collider))| ColliderSnapshot {
                entity: other,
                transform: *t,
                offset: collider.offset,
                shape: collider.shape.clone(),
                bvh: collider.bvh.clone(),
            })
            .collect();

        let mut touched = Vec::new();
        for other in &others {
            if resolve_pair(&mut transform, &mut body, &own_shape, own_offset, other) {
                touched.push(other.entity);
            }
        }

        if let Ok((t, rb)) = world.query_one_mut::<(&mut Transform, &mut RigidBody)>(entity) {
            *t = transform;
            *rb = body;
        }
        for other in touched {
            if let Ok(collider) = world.query_one_mut::<&mut Collider>(other) {
                collider.is_colliding = true;
            }
        }
    }
}

fn resolve_pair(
    transform: &mut Transform,
    body: &mut RigidBody,
    own_shape: &ColliderShape,
    own_offset: Vec3,
    other: &ColliderSnapshot,
) -> bool {
    match (own_shape, &other.shape) {
        (ColliderShape::Box { size }, ColliderShape::Box { size: other_size }) => {
            resolve_box_box(transform, body, *size, own_offset, other, *other_size)
        }
        (ColliderShape::Capsule { radius, height }, ColliderShape::Box { size }) => {
            resolve_capsule_box(transform, body, *radius, *height, own_offset, other, *size)
        }
        (ColliderShape::Sphere { radius }, ColliderShape::Box { size }) => {
            resolve_sphere_box(transform, body, *radius, own_offset, other, *size)
        }
        (ColliderShape::Box { size }, ColliderShape::Mesh { .. }) => match &other.bvh {
            Some(bvh) => resolve_box_mesh(transform, body, *size, own_offset, other, bvh),
            None => false,
        },
        (ColliderShape::Capsule { radius, height }, ColliderShape::Mesh { .. }) => {
            match &other.bvh {
                Some(bvh) => {
                    resolve_capsule_mesh(transform, body, *radius, *height, own_offset, other, bvh)
                }
                None => false,
            }
        }
        (ColliderShape::Sphere { radius }, ColliderShape::Mesh { .. }) => match &other.bvh {
            Some(bvh) => resolve_sphere_mesh(transform, body, *radius, own_offset, other, bvh),
            None => false,
        },
        (ColliderShape::Sphere { radius }, ColliderShape::Sphere { radius: other_radius }) => {
            resolve_sphere_sphere(transform, body, *radius, own_offset, other, *other_radius)
        }
        _ => false,
    }
}

/// Push the body out along the contact normal and update its velocity
///
/// Velocity keeps its tangential component (slide response); only the
/// inward normal component is removed. An upward-enough normal grounds
/// the body, a downward one stops upward motion.
fn apply_response(transform: &mut Transform, body: &mut RigidBody, normal: Vec3, depth: f32) {
    transform.position += normal * depth;
    ground_and_slide(body, normal);
}

fn ground_and_slide(body: &mut RigidBody, normal: Vec3) {
    if normal.y > GROUND_NORMAL_Y {
        body.is_grounded = true;
        if body.velocity.y < 0.0 {
            body.velocity.y = 0.0;
        }
    } else if normal.y < -0.5 && body.velocity.y > 0.0 {
        body.velocity.y = 0.0;
    }

    let inward = body.velocity.dot(normal);
    if inward < 0.0 {
        body.velocity -= normal * inward;
    }
}

fn resolve_box_box(
    transform: &mut Transform,
    body: &mut RigidBody,
    size: Vec3,
    offset: Vec3,
    other: &ColliderSnapshot,
    other_size: Vec3,
) -> bool {
    let a = box_world_aabb(transform, offset, size);
    let b = box_world_aabb(&other.transform, other.offset, other_size);
    if !a.overlaps(&b) {
        return false;
    }

    // Penetration depth along each face direction; the smallest positive
    // one is the separating axis
    let depths = [
        b.max.x - a.min.x,
        a.max.x - b.min.x,
        b.max.y - a.min.y,
        a.max.y - b.min.y,
        b.max.z - a.min.z,
        a.max.z - b.min.z,
    ];
    const DIRS: [Vec3; 6] = [
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::Z,
        Vec3::NEG_Z,
    ];

    let mut axis = 0;
    let mut min_depth = depths[0];
    for (i, &depth) in depths.iter().enumerate().skip(1) {
        if depth < min_depth {
            min_depth = depth;
            axis = i;
        }
    }

    if min_depth <= 0.0 {
        return false;
    }

    apply_response(transform, body, DIRS[axis], min_depth);
    true
}

fn resolve_box_mesh(
    transform: &mut Transform,
    body: &mut RigidBody,
    size: Vec3,
    offset: Vec3,
    other: &ColliderSnapshot,
    bvh: &Bvh,
) -> bool {
    let world = box_world_aabb(transform, offset, size);
    let mesh_matrix = other.transform.to_matrix();
    let inv = mesh_matrix.inverse();

    // Rebound the eight world corners in mesh-local space
    let corners = [
        world.min,
        Vec3::new(world.max.x, world.min.y, world.min.z),
        Vec3::new(world.min.x, world.max.y, world.min.z),
        Vec3::new(world.max.x, world.max.y, world.min.z),
        Vec3::new(world.min.x, world.min.y, world.max.z),
        Vec3::new(world.max.x, world.min.y, world.max.z),
        Vec3::new(world.min.x, world.max.y, world.max.z),
        world.max,
    ];
    let local = match Aabb::from_points(corners.iter().map(|&c| inv.transform_point3(c))) {
        Some(bounds) => bounds,
        None => return false,
    };

    let (local_normal, depth) = match bvh.intersect_aabb(&local) {
        Some(result) => result,
        None => return false,
    };
    if depth <= MIN_MESH_DEPTH {
        return false;
    }

    // Translation transforms as a point delta, the normal via the
    // inverse-transpose (correct under non-uniform scale)
    let world_mtv = mesh_matrix.transform_vector3(local_normal * depth);
    let world_normal = inv
        .transpose()
        .transform_vector3(local_normal)
        .normalize_or_zero();
    if world_normal == Vec3::ZERO {
        return false;
    }

    transform.position += world_mtv;
    ground_and_slide(body, world_normal);
    true
}

fn resolve_capsule_box(
    transform: &mut Transform,
    body: &mut RigidBody,
    radius: f32,
    height: f32,
    offset: Vec3,
    other: &ColliderSnapshot,
    other_size: Vec3,
) -> bool {
    let bounds = box_world_aabb(&other.transform, other.offset, other_size);
    let segment = capsule_segment(transform, offset, radius, height);

    // The deepest of the three segment samples wins
    let mut best: Option<(Vec3, f32)> = None;
    for sample in segment.samples() {
        let closest = sample.clamp(bounds.min, bounds.max);
        let delta = sample - closest;
        let dist_sq = delta.length_squared();
        if dist_sq > radius * radius {
            continue;
        }

        let dist = dist_sq.sqrt();
        let depth = radius - dist;
        if best.map_or(true, |(_, d)| depth > d) {
            let normal = if dist > 1e-4 { delta / dist } else { Vec3::Y };
            best = Some((normal, depth));
        }
    }

    match best {
        Some((normal, depth)) => {
            apply_response(transform, body, normal, depth);
            true
        }
        None => false,
    }
}

fn resolve_capsule_mesh(
    transform: &mut Transform,
    body: &mut RigidBody,
    radius: f32,
    height: f32,
    offset: Vec3,
    other: &ColliderSnapshot,
    bvh: &Bvh,
) -> bool {
    let mesh_matrix = other.transform.to_matrix();
    let inv = mesh_matrix.inverse();

    let mut segment = capsule_segment(transform, offset, radius, height);

    // Query the tree in mesh-local space with a conservatively scaled radius
    let local_a = inv.transform_point3(segment.a);
    let local_b = inv.transform_point3(segment.b);
    let max_scale = other.transform.scale.max_element();
    let local_radius = if max_scale > 1e-4 {
        radius / max_scale
    } else {
        radius
    };
    let query = Aabb::new(local_a.min(local_b), local_a.max(local_b)).expanded(local_radius);

    let mut candidates = Vec::new();
    bvh.query_aabb(&query, &mut candidates);
    if candidates.is_empty() {
        return false;
    }

    let mut collided = false;
    for tri in candidates {
        let v0 = mesh_matrix.transform_point3(tri.v0);
        let v1 = mesh_matrix.transform_point3(tri.v1);
        let v2 = mesh_matrix.transform_point3(tri.v2);

        // Deepest penetrating sample against this triangle
        let mut best: Option<(Vec3, f32)> = None;
        for sample in segment.samples() {
            let tri_point = closest_point_on_triangle(sample, v0, v1, v2);
            let seg_point = closest_point_on_segment(tri_point, segment.a, segment.b);
            let delta = seg_point - tri_point;
            let dist_sq = delta.length_squared();
            if dist_sq > radius * radius {
                continue;
            }

            let dist = dist_sq.sqrt();
            let depth = radius - dist;
            if best.map_or(true, |(_, d)| depth > d) {
                let normal = if dist > 1e-4 {
                    delta / dist
                } else {
                    (v1 - v0).cross(v2 - v0).normalize_or_zero()
                };
                if normal != Vec3::ZERO {
                    best = Some((normal, depth));
                }
            }
        }

        if let Some((normal, depth)) = best {
            apply_response(transform, body, normal, depth);
            collided = true;
            // The correction moved the capsule; later candidates test the
            // new pose
            segment = capsule_segment(transform, offset, radius, height);
        }
    }

    collided
}

fn resolve_sphere_box(
    transform: &mut Transform,
    body: &mut RigidBody,
    radius: f32,
    offset: Vec3,
    other: &ColliderSnapshot,
    other_size: Vec3,
) -> bool {
    let bounds = box_world_aabb(&other.transform, other.offset, other_size);
    let center = sphere_center(transform, offset);

    let closest = center.clamp(bounds.min, bounds.max);
    let delta = center - closest;
    let dist_sq = delta.length_squared();
    if dist_sq > radius * radius {
        return false;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-4 { delta / dist } else { Vec3::Y };
    apply_response(transform, body, normal, radius - dist);
    true
}

fn resolve_sphere_mesh(
    transform: &mut Transform,
    body: &mut RigidBody,
    radius: f32,
    offset: Vec3,
    other: &ColliderSnapshot,
    bvh: &Bvh,
) -> bool {
    let mesh_matrix = other.transform.to_matrix();
    let inv = mesh_matrix.inverse();

    let mut center = sphere_center(transform, offset);
    let local_center = inv.transform_point3(center);
    let max_scale = other.transform.scale.max_element();
    let local_radius = if max_scale > 1e-4 {
        radius / max_scale
    } else {
        radius
    };
    let query = Aabb::from_center_half_extents(local_center, Vec3::splat(local_radius));

    let mut candidates = Vec::new();
    bvh.query_aabb(&query, &mut candidates);
    if candidates.is_empty() {
        return false;
    }

    let mut collided = false;
    for tri in candidates {
        let v0 = mesh_matrix.transform_point3(tri.v0);
        let v1 = mesh_matrix.transform_point3(tri.v1);
        let v2 = mesh_matrix.transform_point3(tri.v2);

        let tri_point = closest_point_on_triangle(center, v0, v1, v2);
        let delta = center - tri_point;
        let dist_sq = delta.length_squared();
        if dist_sq > radius * radius {
            continue;
        }

        let dist = dist_sq.sqrt();
        let normal = if dist > 1e-4 {
            delta / dist
        } else {
            (v1 - v0).cross(v2 - v0).normalize_or_zero()
        };
        if normal == Vec3::ZERO {
            continue;
        }

        apply_response(transform, body, normal, radius - dist);
        collided = true;
        center = sphere_center(transform, offset);
    }

    collided
}

fn resolve_sphere_sphere(
    transform: &mut Transform,
    body: &mut RigidBody,
    radius: f32,
    offset: Vec3,
    other: &ColliderSnapshot,
    other_radius: f32,
) -> bool {
    let own_center = sphere_center(transform, offset);
    let other_center = sphere_center(&other.transform, other.offset);

    let delta = own_center - other_center;
    let dist_sq = delta.length_squared();
    let radius_sum = radius + other_radius;
    if dist_sq > radius_sum * radius_sum {
        return false;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-4 { delta / dist } else { Vec3::Y };
    apply_response(transform, body, normal, radius_sum - dist);
    true
}

/// Closest point on segment `ab` to `p`
fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let denom = ab.length_squared();
    if denom < 1e-8 {
        return a;
    }
    let t = ((p - a).dot(ab) / denom).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point on triangle `abc` to `p` (Voronoi-region walk)
fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(world: &mut World, transform: Transform, collider: Collider) -> ColliderSnapshot {
        let entity = world.spawn((transform, collider));
        let stored = world.get::<Collider>(entity).unwrap();
        ColliderSnapshot {
            entity,
            transform,
            offset: stored.offset,
            shape: stored.shape.clone(),
            bvh: stored.bvh.clone(),
        }
    }

    #[test]
    fn test_closest_point_on_segment() {
        let a = Vec3::new(0.0, -1.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);

        assert_eq!(
            closest_point_on_segment(Vec3::new(5.0, 0.5, 0.0), a, b),
            Vec3::new(0.0, 0.5, 0.0)
        );
        // Clamped to the endpoints
        assert_eq!(closest_point_on_segment(Vec3::new(0.0, 9.0, 0.0), a, b), b);
        assert_eq!(closest_point_on_segment(Vec3::new(0.0, -9.0, 0.0), a, b), a);
        // Degenerate segment
        assert_eq!(closest_point_on_segment(Vec3::X, a, a), a);
    }

    #[test]
    fn test_closest_point_on_triangle() {
        let a = Vec3::new(-1.0, 0.0, -1.0);
        let b = Vec3::new(1.0, 0.0, -1.0);
        let c = Vec3::new(0.0, 0.0, 1.0);

        // Above the interior projects straight down
        let inside = closest_point_on_triangle(Vec3::new(0.0, 2.0, 0.0), a, b, c);
        assert!((inside - Vec3::new(0.0, 0.0, 0.0)).length() < 1e-5);

        // Beyond a vertex clamps to it
        let corner = closest_point_on_triangle(Vec3::new(-5.0, 0.0, -5.0), a, b, c);
        assert_eq!(corner, a);

        // Beyond an edge clamps onto it
        let edge = closest_point_on_triangle(Vec3::new(0.0, 0.0, -3.0), a, b, c);
        assert!((edge - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_box_box_resolves_minimum_axis() {
        let mut world = World::new();
        let other = snapshot(
            &mut world,
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
            Collider::box_collider(Vec3::new(2.0, 2.0, 2.0)),
        );

        let mut transform = Transform::default();
        let mut body = RigidBody::default();
        let hit = resolve_box_box(
            &mut transform,
            &mut body,
            Vec3::new(2.0, 2.0, 2.0),
            Vec3::ZERO,
            &other,
            Vec3::new(2.0, 2.0, 2.0),
        );

        assert!(hit);
        // One unit of separation along x, the minimum-penetration axis
        assert_eq!(transform.position, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_box_box_separated_is_untouched() {
        let mut world = World::new();
        let other = snapshot(
            &mut world,
            Transform::from_position(Vec3::new(10.0, 0.0, 0.0)),
            Collider::box_collider(Vec3::ONE),
        );

        let mut transform = Transform::default();
        let mut body = RigidBody::default();
        let hit = resolve_box_box(
            &mut transform,
            &mut body,
            Vec3::ONE,
            Vec3::ZERO,
            &other,
            Vec3::ONE,
        );

        assert!(!hit);
        assert_eq!(transform.position, Vec3::ZERO);
    }

    #[test]
    fn test_ground_contact_sets_grounded_and_slides() {
        let mut body = RigidBody {
            velocity: Vec3::new(3.0, -5.0, 0.0),
            ..Default::default()
        };
        let mut transform = Transform::default();

        apply_response(&mut transform, &mut body, Vec3::Y, 0.25);

        assert!(body.is_grounded);
        assert_eq!(body.velocity, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(transform.position, Vec3::new(0.0, 0.25, 0.0));
    }

    #[test]
    fn test_ceiling_contact_stops_upward_motion() {
        let mut body = RigidBody {
            velocity: Vec3::new(0.0, 4.0, 1.0),
            ..Default::default()
        };
        let mut transform = Transform::default();

        apply_response(&mut transform, &mut body, Vec3::NEG_Y, 0.1);

        assert!(!body.is_grounded);
        assert_eq!(body.velocity, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_shallow_wall_contact_preserves_tangential_velocity() {
        let mut body = RigidBody {
            velocity: Vec3::new(-2.0, 0.0, 3.0),
            ..Default::default()
        };
        let mut transform = Transform::default();

        apply_response(&mut transform, &mut body, Vec3::X, 0.05);

        // Inward x component removed, tangential z preserved
        assert_eq!(body.velocity, Vec3::new(0.0, 0.0, 3.0));
        assert!(!body.is_grounded);
    }

    #[test]
    fn test_sphere_box_pushes_to_surface() {
        let mut world = World::new();
        // Box top face at y = 0
        let other = snapshot(
            &mut world,
            Transform::from_position(Vec3::new(0.0, -1.0, 0.0)),
            Collider::box_collider(Vec3::new(10.0, 1.0, 10.0)).with_offset(Vec3::new(-5.0, 0.0, -5.0)),
        );

        let mut transform = Transform::from_position(Vec3::new(0.0, 0.3, 0.0));
        let mut body = RigidBody::default();
        let hit = resolve_sphere_box(&mut transform, &mut body, 0.5, Vec3::ZERO, &other, Vec3::new(10.0, 1.0, 10.0));

        assert!(hit);
        assert!((transform.position.y - 0.5).abs() < 1e-5);
        assert!(body.is_grounded);
    }
}
