//! Core components for the entity system

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Transform component representing position, rotation, and scale in local space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// Position in local space
    pub position: Vec3,
    /// Rotation in local space as a quaternion
    pub rotation: Quat,
    /// Scale in local space
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with the given position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a new transform with the given position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert this transform to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Set the scale of the transform
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

/// Name component for user-friendly entity identification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Name(pub String);

impl Name {
    /// Create a new name component
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Path of the mesh asset an entity's geometry comes from
///
/// Colliders with `auto_calculate` read the referenced asset's bounding
/// box through this component once the asset is ready.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshRef(pub String);

impl MeshRef {
    /// Create a new mesh reference from an asset path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_default() {
        let transform = Transform::default();
        assert_eq!(transform.position, Vec3::ZERO);
        assert_eq!(transform.rotation, Quat::IDENTITY);
        assert_eq!(transform.scale, Vec3::ONE);
    }

    #[test]
    fn test_transform_to_matrix() {
        let transform = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        };
        let matrix = transform.to_matrix();
        assert_eq!(matrix.w_axis.truncate(), transform.position);
    }

    #[test]
    fn test_mesh_ref() {
        let mesh_ref = MeshRef::new("meshes/level.obj");
        assert_eq!(mesh_ref.0, "meshes/level.obj");

        let json = serde_json::to_string(&mesh_ref).unwrap();
        let deserialized: MeshRef = serde_json::from_str(&json).unwrap();
        assert_eq!(mesh_ref.0, deserialized.0);
    }
}
