//! Path-keyed mesh asset cache
//!
//! Assets load on the rayon pool and move through a Loading → Ready/Failed
//! state machine. Dependents poll with [`MeshAssets::get`]; an asset that
//! is not ready yet simply yields `None` for the frame and is retried the
//! next time it is asked for.

use crate::assets::mesh::Mesh;
use crate::assets::mesh_loader::{load_mesh_from_file, MeshLoadError};
use crate::physics::collision::{bvh::Bvh, Aabb};
use glam::{Mat4, Vec3};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// A loaded mesh asset: source geometry, bounds, and the collision BVH
/// shared by every collider referencing this asset
#[derive(Debug)]
pub struct MeshAsset {
    /// Source geometry, one entry per sub-mesh
    pub meshes: Vec<Mesh>,
    /// Bounds of all sub-meshes combined
    pub bounds: Aabb,
    /// `None` for empty geometry — a valid "no collision data" state
    pub bvh: Option<Arc<Bvh>>,
}

impl MeshAsset {
    /// Build an asset from raw geometry, constructing its BVH inline
    pub fn from_meshes(meshes: Vec<Mesh>) -> Self {
        let bounds = meshes
            .iter()
            .filter_map(Mesh::bounding_box)
            .reduce(|a, b| a.merge(&b))
            .unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO));
        let bvh = Bvh::build(&meshes, Mat4::IDENTITY).map(Arc::new);

        Self {
            meshes,
            bounds,
            bvh,
        }
    }
}

/// Load state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    /// Nothing cached for this path yet
    Unloaded,
    /// A load is in flight on the worker pool
    Loading,
    /// Asset is available
    Ready,
    /// The load failed; the path stays inactive
    Failed,
}

enum AssetEntry {
    Loading(mpsc::Receiver<Result<MeshAsset, MeshLoadError>>),
    Ready(Arc<MeshAsset>),
    Failed,
}

/// Path-keyed mesh asset cache
///
/// The first load of a path is serialized behind the cache lock; once
/// built, an asset is immutable and shared without further locking.
pub struct MeshAssets {
    entries: Mutex<HashMap<String, AssetEntry>>,
}

impl Default for MeshAssets {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshAssets {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register generated geometry under a path, building its BVH inline
    pub fn insert(&self, path: impl Into<String>, meshes: Vec<Mesh>) -> Arc<MeshAsset> {
        let path = path.into();
        let asset = Arc::new(MeshAsset::from_meshes(meshes));
        debug!(path = %path, triangles = asset.bvh.as_ref().map_or(0, |b| b.triangle_count()), "Registered mesh asset");

        let mut entries = self.lock_entries();
        entries.insert(path, AssetEntry::Ready(asset.clone()));
        asset
    }

    /// Begin loading a path if nothing is cached for it yet
    pub fn request(&self, path: &str) {
        let mut entries = self.lock_entries();
        if !entries.contains_key(path) {
            entries.insert(path.to_string(), spawn_load(path));
        }
    }

    /// The ready asset for a path, if any
    ///
    /// Unknown paths start loading; in-flight loads are polled and
    /// promoted to Ready/Failed when the worker finishes. `None` means
    /// "not usable this frame", never an error.
    pub fn get(&self, path: &str) -> Option<Arc<MeshAsset>> {
        let mut entries = self.lock_entries();

        let entry = entries
            .entry(path.to_string())
            .or_insert_with(|| spawn_load(path));

        let outcome = match entry {
            AssetEntry::Ready(asset) => return Some(asset.clone()),
            AssetEntry::Failed => return None,
            AssetEntry::Loading(receiver) => receiver.try_recv(),
        };

        match outcome {
            Ok(Ok(asset)) => {
                let asset = Arc::new(asset);
                info!(path = %path, "Mesh asset ready");
                *entry = AssetEntry::Ready(asset.clone());
                Some(asset)
            }
            Ok(Err(error)) => {
                warn!(path = %path, error = %error, "Mesh asset load failed");
                *entry = AssetEntry::Failed;
                None
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                warn!(path = %path, "Mesh asset loader dropped without a result");
                *entry = AssetEntry::Failed;
                None
            }
        }
    }

    /// Current state of a path without polling the loader
    pub fn status(&self, path: &str) -> AssetStatus {
        let entries = self.lock_entries();
        match entries.get(path) {
            None => AssetStatus::Unloaded,
            Some(AssetEntry::Loading(_)) => AssetStatus::Loading,
            Some(AssetEntry::Ready(_)) => AssetStatus::Ready,
            Some(AssetEntry::Failed) => AssetStatus::Failed,
        }
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, AssetEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn spawn_load(path: &str) -> AssetEntry {
    let (sender, receiver) = mpsc::channel();
    let owned = path.to_string();
    debug!(path = %owned, "Loading mesh asset");

    rayon::spawn(move || {
        let result = load_mesh_from_file(Path::new(&owned)).map(MeshAsset::from_meshes);
        let _ = sender.send(result);
    });

    AssetEntry::Loading(receiver)
}
