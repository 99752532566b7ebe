//! Entity-Component System (ECS) functionality
//!
//! This module provides the core ECS functionality for the engine:
//! transform components and the world wrapper the physics systems
//! iterate over.

pub mod components;
pub mod world;

// Re-export commonly used types
pub use components::{MeshRef, Name, Transform};
pub use world::World;

// Re-export hecs types that users will need
pub use hecs::Entity;
