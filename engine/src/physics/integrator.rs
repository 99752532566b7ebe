//! Gravity and velocity integration

use crate::core::entity::{Entity, Transform, World};
use crate::physics::components::RigidBody;

/// Apply gravity and advance positions, once per step, before resolution
///
/// Gravity only reaches bodies that are neither grounded nor kinematic;
/// kinematic bodies still move by their externally driven velocity.
pub fn integrate_bodies(world: &mut World, bodies: &[Entity], gravity: f32, dt: f32) {
    for &entity in bodies {
        if let Ok((transform, body)) =
            world.query_one_mut::<(&mut Transform, &mut RigidBody)>(entity)
        {
            if body.use_gravity && !body.is_grounded && !body.is_kinematic {
                body.velocity.y -= gravity * dt;
            }
            transform.position += body.velocity * dt;
        }
    }
}
