//! Collision and physics core for 3D scenes
//!
//! This crate provides the simulation backbone of the engine: BVH
//! construction over static mesh geometry, narrow-phase collision
//! resolution, scene-wide raycasting, and the gravity integrator that
//! drives rigid bodies between resolution steps.

pub mod assets;
pub mod config;
pub mod core;
pub mod physics;

// Re-export commonly used types
pub mod prelude {
    // Entity system types
    pub use crate::core::entity::{Entity, MeshRef, Name, Transform, World};

    // Math types
    pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

    // Asset types
    pub use crate::assets::{Mesh, MeshAsset, MeshAssets, Vertex};

    // Config types
    pub use crate::config::PhysicsSettings;

    // Physics types
    pub use crate::physics::{
        collision::{bvh::Bvh, Aabb, Ray},
        physics_update_system, raycast_scene, Collider, ColliderShape, PhysicsStats,
        RaycastResult, RigidBody,
    };
}

/// Initialize logging for the engine
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
