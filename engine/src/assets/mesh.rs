//! Mesh data structures and primitive generation
//!
//! Provides the triangle geometry colliders and the BVH builder consume,
//! plus generators for common shapes used by tests and procedural content.

use crate::physics::collision::Aabb;
use glam::Vec3;

/// Vertex attributes for mesh geometry
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],
    /// Surface normal vector (normalized)
    pub normal: [f32; 3],
    /// Texture coordinates (UV mapping)
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex with the given attributes
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex data for the mesh
    pub vertices: Vec<Vertex>,
    /// Index data for triangle assembly
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new mesh from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Create a cube mesh with the given side length, centered at the origin
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;

        // One normal and four counter-clockwise corners per face
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            (
                [0.0, 0.0, 1.0],
                [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
            ),
            (
                [0.0, 0.0, -1.0],
                [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
            ),
            (
                [1.0, 0.0, 0.0],
                [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
            ),
            (
                [-1.0, 0.0, 0.0],
                [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
            ),
            (
                [0.0, 1.0, 0.0],
                [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
            ),
            (
                [0.0, -1.0, 0.0],
                [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
            ),
        ];
        let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            for (corner, uv) in corners.iter().zip(uvs) {
                vertices.push(Vertex::new(*corner, normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    /// Create a flat quad in the XZ plane with the given side length,
    /// facing up
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        let up = [0.0, 1.0, 0.0];
        let vertices = vec![
            Vertex::new([-h, 0.0, h], up, [0.0, 1.0]),
            Vertex::new([h, 0.0, h], up, [1.0, 1.0]),
            Vertex::new([h, 0.0, -h], up, [1.0, 0.0]),
            Vertex::new([-h, 0.0, -h], up, [0.0, 0.0]),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];

        Self { vertices, indices }
    }

    /// Build a mesh from a triangle soup, one face normal per triangle
    pub fn from_triangles(triangles: &[[Vec3; 3]]) -> Self {
        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        let mut indices = Vec::with_capacity(triangles.len() * 3);

        for tri in triangles {
            let normal = (tri[1] - tri[0])
                .cross(tri[2] - tri[0])
                .normalize_or_zero()
                .to_array();
            for v in tri {
                indices.push(vertices.len() as u32);
                vertices.push(Vertex::new(v.to_array(), normal, [0.0, 0.0]));
            }
        }

        Self { vertices, indices }
    }

    /// Number of triangles the index buffer assembles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds of the vertex positions, `None` for an empty mesh
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().map(|v| Vec3::from(v.position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_bounds() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);

        let bounds = cube.bounding_box().unwrap();
        assert_eq!(bounds.min, Vec3::splat(-1.0));
        assert_eq!(bounds.max, Vec3::splat(1.0));
    }

    #[test]
    fn test_plane_faces_up() {
        let plane = Mesh::plane(10.0);
        assert_eq!(plane.triangle_count(), 2);

        for chunk in plane.indices.chunks_exact(3) {
            let p = |i: u32| Vec3::from(plane.vertices[i as usize].position);
            let normal = (p(chunk[1]) - p(chunk[0])).cross(p(chunk[2]) - p(chunk[0]));
            assert!(normal.y > 0.0);
        }
    }

    #[test]
    fn test_from_triangles() {
        let mesh = Mesh::from_triangles(&[[Vec3::ZERO, Vec3::X, Vec3::Z]]);
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.bounding_box().is_some());

        let empty = Mesh::from_triangles(&[]);
        assert!(empty.bounding_box().is_none());
    }
}
