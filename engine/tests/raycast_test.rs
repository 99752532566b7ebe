//! Scene raycasting against mixed collider sets

use engine::assets::{Mesh, MeshAssets};
use engine::config::PhysicsSettings;
use engine::core::entity::{Transform, World};
use engine::physics::collision::Ray;
use engine::physics::{physics_update_system, raycast_scene, Collider};
use glam::{Quat, Vec3};

#[test]
fn ray_hits_known_triangle() {
    let mut world = World::new();
    let assets = MeshAssets::new();
    assets.insert(
        "tri",
        vec![Mesh::from_triangles(&[[
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(0.0, 0.0, 2.0),
        ]])],
    );

    let entity = world.spawn((Transform::default(), Collider::mesh("tri")));

    let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    let result = raycast_scene(&world, &assets, &ray);

    assert!(result.hit);
    assert!((result.distance - 10.0).abs() < 1e-4);
    assert!((result.normal - Vec3::Y).length() < 1e-4);
    assert!((result.position - Vec3::ZERO).length() < 1e-4);
    assert_eq!(result.entity, Some(entity));
    assert_eq!(result.submesh, Some(0));
}

#[test]
fn closest_collider_wins() {
    let mut world = World::new();
    let assets = MeshAssets::new();

    // Two boxes stacked along the ray; the higher one is hit first
    world.spawn((
        Transform::from_position(Vec3::new(0.0, 0.0, 0.0)),
        Collider::box_collider(Vec3::ONE).with_offset(Vec3::splat(-0.5)),
    ));
    let near = world.spawn((
        Transform::from_position(Vec3::new(0.0, 3.0, 0.0)),
        Collider::box_collider(Vec3::ONE).with_offset(Vec3::splat(-0.5)),
    ));

    let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    let result = raycast_scene(&world, &assets, &ray);

    assert!(result.hit);
    assert_eq!(result.entity, Some(near));
    assert!((result.distance - 6.5).abs() < 1e-4);
    assert!((result.normal - Vec3::Y).length() < 1e-4);
}

#[test]
fn sphere_colliders_are_hittable() {
    let mut world = World::new();
    let assets = MeshAssets::new();

    let ball = world.spawn((
        Transform::from_position(Vec3::new(0.0, 0.0, -5.0)),
        Collider::sphere(1.0),
    ));

    let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
    let result = raycast_scene(&world, &assets, &ray);

    assert!(result.hit);
    assert_eq!(result.entity, Some(ball));
    assert!((result.distance - 4.0).abs() < 1e-4);
    assert!((result.normal - Vec3::Z).length() < 1e-4);
}

#[test]
fn disabled_colliders_are_invisible_to_rays() {
    let mut world = World::new();
    let assets = MeshAssets::new();

    let mut collider = Collider::box_collider(Vec3::ONE).with_offset(Vec3::splat(-0.5));
    collider.enabled = false;
    world.spawn((Transform::default(), collider));

    let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    assert!(!raycast_scene(&world, &assets, &ray).hit);
}

#[test]
fn not_ready_asset_is_skipped_without_error() {
    let mut world = World::new();
    let assets = MeshAssets::new();

    world.spawn((Transform::default(), Collider::mesh("never_loads.obj")));

    let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
    for _ in 0..3 {
        assert!(!raycast_scene(&world, &assets, &ray).hit);
    }
}

#[test]
fn asset_becomes_hittable_once_ready() {
    let mut world = World::new();
    let assets = MeshAssets::new();
    let settings = PhysicsSettings::default();

    world.spawn((Transform::default(), Collider::mesh("floor")));
    let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -1.0, 0.0));

    assert!(!raycast_scene(&world, &assets, &ray).hit);

    assets.insert("floor", vec![Mesh::plane(20.0)]);
    physics_update_system(&mut world, &assets, &settings, 1.0 / 60.0, false);

    let result = raycast_scene(&world, &assets, &ray);
    assert!(result.hit);
    assert!((result.distance - 10.0).abs() < 1e-4);
}

#[test]
fn transformed_mesh_reports_world_space_hit() {
    let mut world = World::new();
    let assets = MeshAssets::new();
    assets.insert("floor", vec![Mesh::plane(20.0)]);

    // Floor raised to y = 2 and rotated about the vertical axis
    world.spawn((
        Transform::from_position_rotation(
            Vec3::new(0.0, 2.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        ),
        Collider::mesh("floor"),
    ));

    let ray = Ray::new(Vec3::new(1.0, 10.0, 1.0), Vec3::new(0.0, -1.0, 0.0));
    let result = raycast_scene(&world, &assets, &ray);

    assert!(result.hit);
    assert!((result.distance - 8.0).abs() < 1e-3);
    assert!((result.position - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-3);
    assert!((result.normal - Vec3::Y).length() < 1e-3);
}

#[test]
fn empty_scene_returns_no_hit() {
    let world = World::new();
    let assets = MeshAssets::new();

    let ray = Ray::new(Vec3::ZERO, Vec3::X);
    let result = raycast_scene(&world, &assets, &ray);

    assert!(!result.hit);
    assert_eq!(result.entity, None);
}
