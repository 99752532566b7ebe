//! Per-frame physics orchestration
//!
//! One call per frame drives the whole pipeline: transient flag reset,
//! collider bookkeeping against the asset cache, then — only while
//! simulating — integration and narrow-phase resolution. Bookkeeping runs
//! every frame so an editor can preview collider shapes without
//! simulating.

use crate::assets::MeshAssets;
use crate::config::PhysicsSettings;
use crate::core::entity::{Entity, MeshRef, Transform, World};
use crate::physics::collision::narrow_phase::resolve_collisions;
use crate::physics::components::{Collider, ColliderShape, RigidBody};
use crate::physics::integrator::integrate_bodies;
use tracing::{debug, info};

/// Counters published by every physics step
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsStats {
    pub entity_count: u32,
    pub collider_count: u32,
}

/// Advance the physics world by one step
///
/// Sequence: reset `is_colliding`, derive auto-calculated box bounds,
/// attach shared BVHs to mesh colliders, then (when `simulate`) integrate
/// and resolve every `(Transform, RigidBody)` entity against the full
/// collider set. A missing or not-ready asset never raises an error — the
/// collider just stays inactive until the asset is ready.
pub fn physics_update_system(
    world: &mut World,
    assets: &MeshAssets,
    settings: &PhysicsSettings,
    dt: f32,
    simulate: bool,
) -> PhysicsStats {
    let mut stats = PhysicsStats {
        entity_count: world.len(),
        collider_count: 0,
    };

    // 1. Clear per-step contact flags
    for (_, collider) in world.query_mut::<&mut Collider>() {
        collider.is_colliding = false;
        stats.collider_count += 1;
    }

    // 2 + 3. Collider bookkeeping runs every frame, simulating or not
    prepare_colliders(world, assets);

    if !simulate {
        return stats;
    }

    // 4. Collect bodies, integrate, resolve
    let bodies: Vec<Entity> = world
        .query::<(&Transform, &RigidBody)>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    if bodies.is_empty() {
        return stats;
    }

    integrate_bodies(world, &bodies, settings.gravity, dt);
    resolve_collisions(world, &bodies);

    stats
}

/// Derive auto-calculated box bounds and attach shared BVHs once the
/// backing assets are ready
fn prepare_colliders(world: &mut World, assets: &MeshAssets) {
    for (entity, (collider, mesh_ref)) in
        world.query_mut::<(&mut Collider, Option<&MeshRef>)>()
    {
        // Box colliders sized from the owning asset, exactly once
        if collider.auto_calculate && matches!(collider.shape, ColliderShape::Box { .. }) {
            if let Some(mesh_ref) = mesh_ref {
                if let Some(asset) = assets.get(&mesh_ref.0) {
                    if let ColliderShape::Box { size } = &mut collider.shape {
                        *size = asset.bounds.size();
                    }
                    collider.offset = asset.bounds.min;
                    collider.auto_calculate = false;
                    debug!(entity = ?entity, path = %mesh_ref.0, "Derived box collider from asset bounds");
                }
            }
        }

        // Mesh colliders pick up the asset's cached, shared tree
        if collider.bvh.is_none() {
            let model_path = match &collider.shape {
                ColliderShape::Mesh { model_path, .. } => Some(model_path.clone()),
                _ => None,
            };
            if let Some(path) = model_path {
                if let Some(asset) = assets.get(&path) {
                    if let Some(bvh) = &asset.bvh {
                        collider.bvh = Some(bvh.clone());
                        collider.offset = asset.bounds.min;
                        if let ColliderShape::Mesh { size, .. } = &mut collider.shape {
                            *size = asset.bounds.size();
                        }
                        info!(entity = ?entity, path = %path, "Linked shared BVH for mesh collider");
                    }
                }
            }
        }
    }
}
