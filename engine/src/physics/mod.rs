//! Collision detection and rigid-body physics
//!
//! BVH construction over static meshes, narrow-phase resolution between
//! dynamic bodies and the collider set, scene raycasting, and the
//! per-frame step sequencing them. The frame step is strictly sequential;
//! only BVH construction runs off the calling thread.

pub mod collision;
pub mod components;
pub mod integrator;
pub mod raycast;
pub mod system;

// Re-export commonly used types
pub use collision::bvh::{Bvh, BvhBuildTask, BvhHit};
pub use collision::narrow_phase::resolve_collisions;
pub use collision::{Aabb, Ray};
pub use components::{Collider, ColliderShape, RigidBody};
pub use integrator::integrate_bodies;
pub use raycast::{raycast_scene, RaycastResult};
pub use system::{physics_update_system, PhysicsStats};
