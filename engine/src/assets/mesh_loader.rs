//! Mesh file loading utilities
//!
//! Loads collision geometry from OBJ files, one [`Mesh`] per OBJ model so
//! raycast results can report which sub-mesh was hit.

use crate::assets::mesh::{Mesh, Vertex};
use glam::Vec3;
use std::path::Path;
use tracing::{debug, info};

/// Errors that can occur during mesh loading
#[derive(Debug, thiserror::Error)]
pub enum MeshLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OBJ loading error: {0}")]
    ObjLoad(#[from] tobj::LoadError),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No mesh data found in file")]
    NoMeshData,
}

/// Load every model in a mesh file
pub fn load_mesh_from_file(path: &Path) -> Result<Vec<Mesh>, MeshLoadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "obj" => load_obj(path),
        ext => Err(MeshLoadError::UnsupportedFormat(ext.to_string())),
    }
}

/// Load all models from an OBJ file
fn load_obj(path: &Path) -> Result<Vec<Mesh>, MeshLoadError> {
    info!("Loading OBJ file: {:?}", path);

    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )?;

    if models.is_empty() {
        return Err(MeshLoadError::NoMeshData);
    }

    let mut meshes = Vec::with_capacity(models.len());
    for model in &models {
        let mesh = &model.mesh;
        let num_vertices = mesh.positions.len() / 3;

        debug!(
            "Loaded OBJ model '{}' with {} vertices and {} indices",
            model.name,
            num_vertices,
            mesh.indices.len()
        );

        let mut vertices = Vec::with_capacity(num_vertices);
        for i in 0..num_vertices {
            let pos_offset = i * 3;
            let position = [
                mesh.positions[pos_offset],
                mesh.positions[pos_offset + 1],
                mesh.positions[pos_offset + 2],
            ];

            let normal = if mesh.normals.len() >= pos_offset + 3 {
                [
                    mesh.normals[pos_offset],
                    mesh.normals[pos_offset + 1],
                    mesh.normals[pos_offset + 2],
                ]
            } else {
                [0.0, 1.0, 0.0]
            };

            let uv = if mesh.texcoords.len() >= i * 2 + 2 {
                [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };

            vertices.push(Vertex {
                position,
                normal,
                uv,
            });
        }

        if mesh.normals.is_empty() {
            calculate_normals(&mut vertices, &mesh.indices);
        }

        meshes.push(Mesh {
            vertices,
            indices: mesh.indices.clone(),
        });
    }

    Ok(meshes)
}

/// Calculate vertex normals from face geometry
fn calculate_normals(vertices: &mut [Vertex], indices: &[u32]) {
    for vertex in vertices.iter_mut() {
        vertex.normal = [0.0, 0.0, 0.0];
    }

    // Accumulate face normals on each referenced vertex
    for chunk in indices.chunks_exact(3) {
        let (i0, i1, i2) = (chunk[0] as usize, chunk[1] as usize, chunk[2] as usize);
        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }

        let v0 = Vec3::from(vertices[i0].position);
        let v1 = Vec3::from(vertices[i1].position);
        let v2 = Vec3::from(vertices[i2].position);
        let face_normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();

        for &i in &[i0, i1, i2] {
            let sum = Vec3::from(vertices[i].normal) + face_normal;
            vertices[i].normal = sum.to_array();
        }
    }

    for vertex in vertices.iter_mut() {
        vertex.normal = Vec3::from(vertex.normal).normalize_or_zero().to_array();
    }
}
