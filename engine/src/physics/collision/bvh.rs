//! Bounding volume hierarchy over static mesh triangles
//!
//! A tree is built once per mesh asset and shared read-only by every
//! collider referencing that asset. Queries never mutate the tree, so a
//! built `Bvh` can be read concurrently without locking.

use crate::assets::Mesh;
use crate::physics::collision::{Aabb, Ray};
use glam::{Mat4, Vec3};
use std::sync::mpsc;
use tracing::debug;

/// Leaves store at most this many triangles
const MAX_LEAF_TRIANGLES: usize = 4;
/// Recursion stops below this depth regardless of triangle count
const MAX_DEPTH: u32 = 20;

/// A single triangle with precomputed bounds and centroid
#[derive(Debug, Clone)]
pub struct CollisionTriangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    /// Per-vertex minimum, cached for AABB tests
    pub min: Vec3,
    /// Per-vertex maximum, cached for AABB tests
    pub max: Vec3,
    /// Centroid used for partitioning
    pub centroid: Vec3,
    /// Which source mesh this triangle came from
    pub submesh: u32,
    /// Index of the triangle within the built tree
    pub index: u32,
}

impl CollisionTriangle {
    /// Create a triangle, deriving bounds and centroid
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, submesh: u32, index: u32) -> Self {
        Self {
            v0,
            v1,
            v2,
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
            centroid: (v0 + v1 + v2) / 3.0,
            submesh,
            index,
        }
    }

    /// The triangle's axis-aligned bounds
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.min, self.max)
    }

    /// Unit face normal, or `None` for a degenerate triangle
    pub fn face_normal(&self) -> Option<Vec3> {
        (self.v1 - self.v0).cross(self.v2 - self.v0).try_normalize()
    }

    /// Möller–Trumbore ray/triangle intersection (two-sided)
    ///
    /// Degenerate triangles never report a hit.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        let pvec = ray.direction.cross(edge2);
        let det = edge1.dot(pvec);

        if det.abs() < 1e-6 {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.origin - self.v0;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(edge1);
        let v = ray.direction.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(qvec) * inv_det;
        (t > 1e-6).then_some(t)
    }
}

/// Node of the hierarchy: either an internal node with two children or a
/// leaf owning a slice of the triangle set
#[derive(Debug)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub left: Option<Box<BvhNode>>,
    pub right: Option<Box<BvhNode>>,
    pub triangles: Vec<CollisionTriangle>,
}

impl BvhNode {
    /// A node is a leaf iff it has no children
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Nearest-hit result of a BVH raycast
#[derive(Debug, Clone, Copy)]
pub struct BvhHit {
    pub distance: f32,
    pub normal: Vec3,
    pub submesh: u32,
    pub triangle: u32,
}

/// Immutable triangle hierarchy for a mesh asset
#[derive(Debug)]
pub struct Bvh {
    root: BvhNode,
    triangle_count: usize,
}

/// Handle to a build running on the worker pool
///
/// The build cannot be cancelled; dropping the handle discards the result
/// once it arrives.
pub struct BvhBuildTask {
    receiver: mpsc::Receiver<Option<Bvh>>,
}

impl BvhBuildTask {
    /// Non-blocking poll: `Some(result)` once the build finished
    pub fn try_take(&self) -> Option<Option<Bvh>> {
        self.receiver.try_recv().ok()
    }

    /// Block until the build completes
    pub fn wait(self) -> Option<Bvh> {
        self.receiver.recv().ok().flatten()
    }
}

impl Bvh {
    /// Build a tree over every triangle of the given meshes, vertices
    /// pre-transformed by `transform`. Returns `None` when there are no
    /// triangles — a valid "no collision data" state, not an error.
    pub fn build(meshes: &[Mesh], transform: Mat4) -> Option<Bvh> {
        let mut triangles = Vec::new();

        for (submesh, mesh) in meshes.iter().enumerate() {
            for chunk in mesh.indices.chunks_exact(3) {
                let (i0, i1, i2) = (chunk[0] as usize, chunk[1] as usize, chunk[2] as usize);
                if i0 >= mesh.vertices.len()
                    || i1 >= mesh.vertices.len()
                    || i2 >= mesh.vertices.len()
                {
                    continue;
                }

                let v0 = transform.transform_point3(Vec3::from(mesh.vertices[i0].position));
                let v1 = transform.transform_point3(Vec3::from(mesh.vertices[i1].position));
                let v2 = transform.transform_point3(Vec3::from(mesh.vertices[i2].position));
                if !(v0.is_finite() && v1.is_finite() && v2.is_finite()) {
                    continue;
                }

                let index = triangles.len() as u32;
                triangles.push(CollisionTriangle::new(v0, v1, v2, submesh as u32, index));
            }
        }

        if triangles.is_empty() {
            return None;
        }

        let triangle_count = triangles.len();
        let root = build_node(triangles, 0);
        debug!(triangles = triangle_count, "Built collision BVH");

        Some(Bvh {
            root,
            triangle_count,
        })
    }

    /// Identical result to [`Bvh::build`], produced on the rayon pool so
    /// large meshes don't block the calling thread. Callers must not
    /// assume completion until the handle yields a result.
    pub fn build_async(meshes: Vec<Mesh>, transform: Mat4) -> BvhBuildTask {
        let (sender, receiver) = mpsc::channel();
        rayon::spawn(move || {
            let _ = sender.send(Bvh::build(&meshes, transform));
        });
        BvhBuildTask { receiver }
    }

    /// Root node of the hierarchy
    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    /// Bounds of the whole triangle set
    pub fn bounds(&self) -> Aabb {
        self.root.bounds
    }

    /// Total number of triangles stored in the tree
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Nearest ray hit, pruning subtrees whose entry distance already
    /// exceeds the best hit
    pub fn raycast(&self, ray: &Ray) -> Option<BvhHit> {
        let mut best = None;
        raycast_node(&self.root, ray, &mut best);
        best
    }

    /// Deepest triangle contact for an AABB overlapping the tree:
    /// contact normal plus penetration depth along it
    pub fn intersect_aabb(&self, bounds: &Aabb) -> Option<(Vec3, f32)> {
        let mut best = None;
        intersect_node(&self.root, bounds, &mut best);
        best
    }

    /// Collect triangles whose bounds intersect the query box
    pub fn query_aabb<'a>(&'a self, bounds: &Aabb, out: &mut Vec<&'a CollisionTriangle>) {
        query_node(&self.root, bounds, out);
    }
}

fn build_node(mut triangles: Vec<CollisionTriangle>, depth: u32) -> BvhNode {
    let bounds = triangles
        .iter()
        .map(CollisionTriangle::bounds)
        .reduce(|a, b| a.merge(&b))
        .unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO));

    if triangles.len() <= MAX_LEAF_TRIANGLES || depth > MAX_DEPTH {
        return BvhNode {
            bounds,
            left: None,
            right: None,
            triangles,
        };
    }

    // Split along the longest extent, at the median centroid
    let extent = bounds.size();
    let axis = if extent.y > extent.x && extent.y >= extent.z {
        1
    } else if extent.z > extent.x && extent.z > extent.y {
        2
    } else {
        0
    };

    triangles.sort_unstable_by(|a, b| {
        a.centroid[axis]
            .partial_cmp(&b.centroid[axis])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let right = triangles.split_off(triangles.len() / 2);
    BvhNode {
        bounds,
        left: Some(Box::new(build_node(triangles, depth + 1))),
        right: Some(Box::new(build_node(right, depth + 1))),
        triangles: Vec::new(),
    }
}

fn raycast_node(node: &BvhNode, ray: &Ray, best: &mut Option<BvhHit>) {
    let entry = match ray.aabb_entry(&node.bounds) {
        Some(t) => t,
        None => return,
    };
    if let Some(hit) = best {
        if entry >= hit.distance {
            return;
        }
    }

    if node.is_leaf() {
        for tri in &node.triangles {
            if let Some(t) = tri.intersect_ray(ray) {
                if best.as_ref().map_or(true, |hit| t < hit.distance) {
                    if let Some(mut normal) = tri.face_normal() {
                        // Report the face normal opposing the ray
                        if normal.dot(ray.direction) > 0.0 {
                            normal = -normal;
                        }
                        *best = Some(BvhHit {
                            distance: t,
                            normal,
                            submesh: tri.submesh,
                            triangle: tri.index,
                        });
                    }
                }
            }
        }
    } else {
        if let Some(left) = &node.left {
            raycast_node(left, ray, best);
        }
        if let Some(right) = &node.right {
            raycast_node(right, ray, best);
        }
    }
}

fn intersect_node(node: &BvhNode, bounds: &Aabb, best: &mut Option<(Vec3, f32)>) {
    if !node.bounds.overlaps(bounds) {
        return;
    }

    if node.is_leaf() {
        let center = bounds.center();
        let extent = bounds.size();
        for tri in &node.triangles {
            if !triangle_overlaps_aabb(tri, bounds) {
                continue;
            }
            let normal = match tri.face_normal() {
                Some(n) => n,
                None => continue,
            };

            // Penetration along the triangle plane: box projection radius
            // minus the center's plane distance
            let dist = (tri.v0 - center).dot(normal);
            let radius = 0.5
                * ((normal.x * extent.x).abs()
                    + (normal.y * extent.y).abs()
                    + (normal.z * extent.z).abs());
            let depth = radius - dist.abs();

            if best.as_ref().map_or(true, |(_, d)| depth > *d) {
                let push = if dist > 0.0 { -normal } else { normal };
                *best = Some((push, depth));
            }
        }
    } else {
        if let Some(left) = &node.left {
            intersect_node(left, bounds, best);
        }
        if let Some(right) = &node.right {
            intersect_node(right, bounds, best);
        }
    }
}

fn query_node<'a>(node: &'a BvhNode, bounds: &Aabb, out: &mut Vec<&'a CollisionTriangle>) {
    if !node.bounds.overlaps(bounds) {
        return;
    }

    if node.is_leaf() {
        for tri in &node.triangles {
            if tri.bounds().overlaps(bounds) {
                out.push(tri);
            }
        }
    } else {
        if let Some(left) = &node.left {
            query_node(left, bounds, out);
        }
        if let Some(right) = &node.right {
            query_node(right, bounds, out);
        }
    }
}

/// Separating-axis triangle/AABB overlap test (13 axes)
fn triangle_overlaps_aabb(tri: &CollisionTriangle, bounds: &Aabb) -> bool {
    if !tri.bounds().overlaps(bounds) {
        return false;
    }

    let center = bounds.center();
    let half = bounds.half_extents();
    let v0 = tri.v0 - center;
    let v1 = tri.v1 - center;
    let v2 = tri.v2 - center;

    let e0 = v1 - v0;
    let e1 = v2 - v1;
    let e2 = v0 - v2;

    let axes = [
        Vec3::X,
        Vec3::Y,
        Vec3::Z,
        e0.cross(e1),
        Vec3::X.cross(e0),
        Vec3::X.cross(e1),
        Vec3::X.cross(e2),
        Vec3::Y.cross(e0),
        Vec3::Y.cross(e1),
        Vec3::Y.cross(e2),
        Vec3::Z.cross(e0),
        Vec3::Z.cross(e1),
        Vec3::Z.cross(e2),
    ];

    for axis in axes {
        if axis.length_squared() < 1e-8 {
            continue;
        }
        let p0 = v0.dot(axis);
        let p1 = v1.dot(axis);
        let p2 = v2.dot(axis);
        let r = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs();
        if p0.min(p1).min(p2) > r || p0.max(p1).max(p2) < -r {
            return false;
        }
    }

    true
}
