//! World wrapper providing helper methods for entity management

use hecs::Entity;

/// Wrapper around hecs::World providing additional helper methods
pub struct World {
    inner: hecs::World,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn a new entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Get a reference to a component on an entity
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Query a single entity for a mutable component reference
    pub fn query_one_mut<Q: hecs::Query>(
        &mut self,
        entity: Entity,
    ) -> Result<Q::Item<'_>, hecs::QueryOneError> {
        self.inner.query_one_mut::<Q>(entity)
    }

    /// Insert a component into an entity
    pub fn insert_one(
        &mut self,
        entity: Entity,
        component: impl hecs::Component,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.inner.insert_one(entity, component)
    }

    /// Query entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<Q> {
        self.inner.query()
    }

    /// Query entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<Q> {
        self.inner.query_mut()
    }

    /// Despawn an entity and all its components
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Number of live entities in the world
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Whether the world contains no entities
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Get access to the inner hecs::World for advanced operations
    pub fn inner(&self) -> &hecs::World {
        &self.inner
    }

    /// Get mutable access to the inner hecs::World for advanced operations
    pub fn inner_mut(&mut self) -> &mut hecs::World {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::components::Transform;
    use glam::Vec3;

    #[test]
    fn test_world_spawn() {
        let mut world = World::new();
        let entity = world.spawn((Transform::default(),));
        assert!(world.contains(entity));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_query_one_mut() {
        let mut world = World::new();
        let entity = world.spawn((Transform::default(),));

        {
            let transform = world.query_one_mut::<&mut Transform>(entity).unwrap();
            transform.position = Vec3::new(1.0, 2.0, 3.0);
        }

        let transform = world.get::<Transform>(entity).unwrap();
        assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_despawn() {
        let mut world = World::new();
        let entity = world.spawn((Transform::default(),));
        world.despawn(entity).unwrap();
        assert!(!world.contains(entity));
        assert!(world.is_empty());
    }
}
