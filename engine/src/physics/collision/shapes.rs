//! Collider shape utilities and world-space transforms

use crate::core::entity::Transform;
use crate::physics::collision::Aabb;
use glam::Vec3;

/// Core segment of a capsule plus its radius
#[derive(Debug, Clone, Copy)]
pub struct CapsuleSegment {
    /// Lower endpoint of the segment
    pub a: Vec3,
    /// Upper endpoint of the segment
    pub b: Vec3,
    pub radius: f32,
}

impl CapsuleSegment {
    /// Sample points for penetration tests: both endpoints and the midpoint
    pub fn samples(&self) -> [Vec3; 3] {
        [self.a, (self.a + self.b) * 0.5, self.b]
    }

    /// Bounds of the full capsule volume
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.a.min(self.b), self.a.max(self.b)).expanded(self.radius)
    }
}

/// World-space AABB of a box collider; the scaled offset is the minimum
/// corner, matching how box colliders are authored
pub fn box_world_aabb(transform: &Transform, offset: Vec3, size: Vec3) -> Aabb {
    let min = transform.position + offset * transform.scale;
    Aabb::new(min, min + size * transform.scale)
}

/// Capsule core segment in world space
///
/// Zero-height capsules collapse to a point (the segment half-length is
/// clamped to zero).
pub fn capsule_segment(transform: &Transform, offset: Vec3, radius: f32, height: f32) -> CapsuleSegment {
    let center = transform.position + offset;
    let half = (height * 0.5 - radius).max(0.0);
    CapsuleSegment {
        a: center - Vec3::Y * half,
        b: center + Vec3::Y * half,
        radius,
    }
}

/// Sphere center in world space
pub fn sphere_center(transform: &Transform, offset: Vec3) -> Vec3 {
    transform.position + offset
}
