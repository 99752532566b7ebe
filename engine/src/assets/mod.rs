//! Mesh assets and the path-keyed asset cache

pub mod manager;
pub mod mesh;
pub mod mesh_loader;

pub use manager::{AssetStatus, MeshAsset, MeshAssets};
pub use mesh::{Mesh, Vertex};
pub use mesh_loader::{load_mesh_from_file, MeshLoadError};
