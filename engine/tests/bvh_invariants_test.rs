//! Structural invariants of the collision BVH

use engine::assets::Mesh;
use engine::physics::collision::bvh::{Bvh, BvhNode};
use engine::physics::collision::Ray;
use glam::{Mat4, Vec3};

/// Deterministic triangle grid large enough to force several splits
fn grid_mesh(n: u32) -> Mesh {
    let mut triangles = Vec::new();
    for x in 0..n {
        for z in 0..n {
            let base = Vec3::new(x as f32, 0.0, z as f32);
            triangles.push([
                base,
                base + Vec3::new(1.0, 0.0, 0.0),
                base + Vec3::new(1.0, 0.0, 1.0),
            ]);
            triangles.push([
                base,
                base + Vec3::new(1.0, 0.0, 1.0),
                base + Vec3::new(0.0, 0.0, 1.0),
            ]);
        }
    }
    Mesh::from_triangles(&triangles)
}

/// Walk the tree checking every structural invariant; returns the number
/// of triangles found beneath the node
fn check_node(node: &BvhNode) -> usize {
    if node.is_leaf() {
        assert!(node.left.is_none() && node.right.is_none());
        for tri in &node.triangles {
            assert!(
                node.bounds.contains(&tri.bounds()),
                "leaf bounds must contain member triangles"
            );
        }
        node.triangles.len()
    } else {
        let left = node.left.as_ref().expect("internal node missing left child");
        let right = node
            .right
            .as_ref()
            .expect("internal node missing right child");
        assert!(
            node.triangles.is_empty(),
            "internal nodes must not own triangles"
        );
        assert!(node.bounds.contains(&left.bounds));
        assert!(node.bounds.contains(&right.bounds));
        check_node(left) + check_node(right)
    }
}

#[test]
fn node_bounds_contain_children_and_triangles() {
    let bvh = Bvh::build(&[grid_mesh(8)], Mat4::IDENTITY).unwrap();

    let total = check_node(bvh.root());
    assert_eq!(total, 128);
    assert_eq!(bvh.triangle_count(), 128);

    // The grid forced actual partitioning
    assert!(!bvh.root().is_leaf());
}

#[test]
fn leaves_hold_at_most_four_triangles() {
    let bvh = Bvh::build(&[grid_mesh(8)], Mat4::IDENTITY).unwrap();

    fn max_leaf_len(node: &BvhNode) -> usize {
        if node.is_leaf() {
            node.triangles.len()
        } else {
            let left = node.left.as_deref().map_or(0, max_leaf_len);
            let right = node.right.as_deref().map_or(0, max_leaf_len);
            left.max(right)
        }
    }
    assert!(max_leaf_len(bvh.root()) <= 4);
}

#[test]
fn raycast_matches_analytic_intersection() {
    let mesh = Mesh::from_triangles(&[[
        Vec3::new(-1.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::new(0.0, 0.0, 2.0),
    ]]);
    let bvh = Bvh::build(&[mesh], Mat4::IDENTITY).unwrap();

    let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    let hit = bvh.raycast(&ray).unwrap();

    assert!((hit.distance - 10.0).abs() < 1e-4);
    assert!((hit.normal - Vec3::Y).length() < 1e-4);
    assert_eq!(hit.submesh, 0);
    assert_eq!(hit.triangle, 0);
}

#[test]
fn empty_triangle_list_builds_no_tree() {
    assert!(Bvh::build(&[], Mat4::IDENTITY).is_none());

    let empty = Mesh::new(Vec::new(), Vec::new());
    assert!(Bvh::build(&[empty], Mat4::IDENTITY).is_none());
}

#[test]
fn submesh_indices_survive_the_build() {
    let near = Mesh::from_triangles(&[[
        Vec3::new(-1.0, 0.0, -1.0),
        Vec3::new(1.0, 0.0, -1.0),
        Vec3::new(0.0, 0.0, 1.0),
    ]]);
    let far = Mesh::from_triangles(&[[
        Vec3::new(-1.0, -5.0, -1.0),
        Vec3::new(1.0, -5.0, -1.0),
        Vec3::new(0.0, -5.0, 1.0),
    ]]);
    let bvh = Bvh::build(&[near, far], Mat4::IDENTITY).unwrap();

    let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    let hit = bvh.raycast(&ray).unwrap();

    // Nearest hit comes from the first sub-mesh
    assert_eq!(hit.submesh, 0);
    assert!((hit.distance - 10.0).abs() < 1e-4);
}

#[test]
fn async_build_produces_the_same_tree() {
    let sync = Bvh::build(&[grid_mesh(4)], Mat4::IDENTITY).unwrap();
    let built = Bvh::build_async(vec![grid_mesh(4)], Mat4::IDENTITY)
        .wait()
        .unwrap();

    assert_eq!(sync.triangle_count(), built.triangle_count());
    assert_eq!(sync.bounds(), built.bounds());
    check_node(built.root());
}
