//! Physics components for the entity system

use crate::physics::collision::bvh::Bvh;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rigid body component for physics simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    /// Linear velocity in world space
    pub velocity: Vec3,
    /// Mass in kilograms
    pub mass: f32,
    /// Whether this body is affected by gravity
    pub use_gravity: bool,
    /// Kinematic bodies never receive gravity and are driven externally
    pub is_kinematic: bool,
    /// Set when a contact normal points sufficiently upward; re-derived
    /// every step
    #[serde(skip)]
    pub is_grounded: bool,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            mass: 1.0,
            use_gravity: true,
            is_kinematic: false,
            is_grounded: false,
        }
    }
}

impl RigidBody {
    /// Create a dynamic rigid body with the given mass
    pub fn dynamic(mass: f32) -> Self {
        Self {
            mass,
            ..Default::default()
        }
    }

    /// Create a kinematic rigid body (driven externally, no gravity)
    pub fn kinematic() -> Self {
        Self {
            is_kinematic: true,
            use_gravity: false,
            ..Default::default()
        }
    }
}

/// Collision shape; the narrow phase dispatches on the pair of tags
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ColliderShape {
    /// Axis-aligned box spanning `offset .. offset + size` in local space
    Box { size: Vec3 },
    /// Sphere centered at the collider offset
    Sphere { radius: f32 },
    /// Vertical capsule; `height` is the total height including both caps
    Capsule { radius: f32, height: f32 },
    /// Static triangle mesh resolved through the asset cache. `size`
    /// mirrors the asset bounds once the shared BVH is attached.
    Mesh { model_path: String, size: Vec3 },
}

impl Default for ColliderShape {
    fn default() -> Self {
        ColliderShape::Box { size: Vec3::ONE }
    }
}

/// Collider component for collision detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collider {
    /// Collision shape type
    pub shape: ColliderShape,
    /// Local-space offset of the shape (the minimum corner for boxes)
    pub offset: Vec3,
    /// Disabled colliders are skipped by resolution and raycasts
    pub enabled: bool,
    /// Derive box size/offset from the entity's mesh asset once it is
    /// ready, then clear
    pub auto_calculate: bool,
    /// Transient per-step contact flag
    #[serde(skip)]
    pub is_colliding: bool,
    /// Shared tree attached from the asset cache
    #[serde(skip)]
    pub bvh: Option<Arc<Bvh>>,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: ColliderShape::default(),
            offset: Vec3::ZERO,
            enabled: true,
            auto_calculate: false,
            is_colliding: false,
            bvh: None,
        }
    }
}

impl Collider {
    /// Create a box collider with explicit size
    pub fn box_collider(size: Vec3) -> Self {
        Self {
            shape: ColliderShape::Box { size },
            ..Default::default()
        }
    }

    /// Create a box collider sized from the entity's mesh asset on the
    /// first step where the asset is ready
    pub fn auto_box() -> Self {
        Self {
            auto_calculate: true,
            ..Default::default()
        }
    }

    /// Create a sphere collider
    pub fn sphere(radius: f32) -> Self {
        Self {
            shape: ColliderShape::Sphere { radius },
            ..Default::default()
        }
    }

    /// Create a capsule collider
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self {
            shape: ColliderShape::Capsule { radius, height },
            ..Default::default()
        }
    }

    /// Create a mesh collider backed by the asset at `model_path`
    pub fn mesh(model_path: impl Into<String>) -> Self {
        Self {
            shape: ColliderShape::Mesh {
                model_path: model_path.into(),
                size: Vec3::ZERO,
            },
            ..Default::default()
        }
    }

    /// Set the local offset
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rigid_body_defaults() {
        let body = RigidBody::default();
        assert_eq!(body.mass, 1.0);
        assert!(body.use_gravity);
        assert!(!body.is_kinematic);
        assert!(!body.is_grounded);

        let kinematic = RigidBody::kinematic();
        assert!(kinematic.is_kinematic);
        assert!(!kinematic.use_gravity);
    }

    #[test]
    fn test_collider_constructors() {
        let collider = Collider::box_collider(Vec3::new(1.0, 2.0, 3.0));
        assert!(collider.enabled);
        assert!(!collider.auto_calculate);
        assert_eq!(
            collider.shape,
            ColliderShape::Box {
                size: Vec3::new(1.0, 2.0, 3.0)
            }
        );

        let auto = Collider::auto_box();
        assert!(auto.auto_calculate);

        let mesh = Collider::mesh("meshes/level.obj");
        assert!(matches!(mesh.shape, ColliderShape::Mesh { .. }));
        assert!(mesh.bvh.is_none());
    }

    #[test]
    fn test_transient_fields_skip_serialization() {
        let mut collider = Collider::box_collider(Vec3::ONE);
        collider.is_colliding = true;

        let json = serde_json::to_string(&collider).unwrap();
        let restored: Collider = serde_json::from_str(&json).unwrap();
        assert!(!restored.is_colliding);
        assert!(restored.bvh.is_none());
        assert_eq!(restored.shape, collider.shape);
    }
}
