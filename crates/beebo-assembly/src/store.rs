//! Asset stores - where model scene graphs come from
//!
//! Assets are addressed as `models/<filename>`. `GltfStore` reads GLB/glTF
//! files from disk and converts them into [`SceneNode`] trees; `MemoryStore`
//! serves prebuilt trees for previews and tests.

use beebo_core::{Material, Mesh, SceneNode};
use glam::{Mat4, Vec3};
use gltf::material::AlphaMode;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::LoadError;
use crate::progress::ProgressSink;

/// Directory prefix for every asset path
pub const MODELS_DIR: &str = "models";

/// Read granularity for progress reporting
const CHUNK_SIZE: usize = 64 * 1024;

/// Fetchable path for an asset filename
pub fn asset_path(filename: &str) -> String {
    format!("{}/{}", MODELS_DIR, filename)
}

/// Source of raw model scene graphs
pub trait AssetStore: Send + Sync {
    /// Fetch and parse the asset at `path`, reporting bytes to `progress`
    fn fetch(
        &self,
        path: &str,
        progress: &dyn ProgressSink,
    ) -> impl Future<Output = Result<SceneNode, LoadError>> + Send;
}

/// In-memory store keyed by asset path
#[derive(Debug, Default)]
pub struct MemoryStore {
    assets: HashMap<String, SceneNode>,
    failing: HashSet<String>,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under `models/<filename>`
    pub fn insert(&mut self, filename: &str, node: SceneNode) {
        self.assets.insert(asset_path(filename), node);
    }

    pub fn with_asset(mut self, filename: &str, node: SceneNode) -> Self {
        self.insert(filename, node);
        self
    }

    /// Make every fetch of `filename` fail with a parse error
    pub fn fail(&mut self, filename: &str) {
        self.failing.insert(asset_path(filename));
    }

    /// Number of fetches served or refused so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl AssetStore for MemoryStore {
    async fn fetch(&self, path: &str, progress: &dyn ProgressSink) -> Result<SceneNode, LoadError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(path) {
            return Err(LoadError::Parse {
                path: path.to_string(),
                message: "forced failure".to_string(),
            });
        }
        let node = self
            .assets
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_string()))?;
        progress.progress(path, 1, 1);
        Ok(node)
    }
}

/// Reads GLB/glTF assets from a directory containing `models/`
#[derive(Debug, Clone)]
pub struct GltfStore {
    root: PathBuf,
}

impl GltfStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of an asset path
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetStore for GltfStore {
    async fn fetch(&self, path: &str, progress: &dyn ProgressSink) -> Result<SceneNode, LoadError> {
        let full = self.resolve(path);
        let io_error = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(path.to_string())
            } else {
                LoadError::Io {
                    path: path.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let mut file = tokio::fs::File::open(&full).await.map_err(io_error)?;
        let total = file.metadata().await.map(|m| m.len()).unwrap_or(0);
        let mut bytes = Vec::with_capacity(total as usize);
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut chunk).await.map_err(io_error)?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
            let loaded = bytes.len() as u64;
            progress.progress(path, loaded, total.max(loaded));
        }
        debug!(path = %path, bytes = bytes.len(), "Read asset");

        // Buffer URIs inside .gltf files resolve next to the file
        let base = full.parent().map(Path::to_path_buf);
        let owned_path = path.to_string();
        tokio::task::spawn_blocking(move || parse_gltf(&owned_path, &bytes, base.as_deref()))
            .await
            .map_err(|e| LoadError::Task {
                path: path.to_string(),
                message: e.to_string(),
            })?
    }
}

/// Convert GLB/glTF bytes into a scene graph (default scene, or the first)
pub fn parse_gltf(path: &str, bytes: &[u8], base: Option<&Path>) -> Result<SceneNode, LoadError> {
    let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| parse_error(path, e))?;
    let document = gltf.document;
    let buffers =
        gltf::import_buffers(&document, base, gltf.blob).map_err(|e| parse_error(path, e))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| LoadError::NoScene(path.to_string()))?;

    Ok(SceneNode {
        name: scene.name().map(str::to_string),
        transform: Mat4::IDENTITY,
        meshes: Vec::new(),
        children: scene.nodes().map(|n| convert_node(&n, &buffers)).collect(),
    })
}

fn parse_error(path: &str, e: gltf::Error) -> LoadError {
    LoadError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    }
}

fn convert_node(node: &gltf::Node<'_>, buffers: &[gltf::buffer::Data]) -> SceneNode {
    // Only triangle lists carry surfaces the probe can hit
    let meshes = node
        .mesh()
        .map(|mesh| {
            mesh.primitives()
                .filter(|p| p.mode() == gltf::mesh::Mode::Triangles)
                .map(|p| convert_primitive(&p, buffers))
                .collect()
        })
        .unwrap_or_default();

    SceneNode {
        name: node.name().map(str::to_string),
        transform: Mat4::from_cols_array_2d(&node.transform().matrix()),
        meshes,
        children: node.children().map(|c| convert_node(&c, buffers)).collect(),
    }
}

fn convert_primitive(primitive: &gltf::Primitive<'_>, buffers: &[gltf::buffer::Data]) -> Mesh {
    let reader =
        primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions = reader
        .read_positions()
        .map(|iter| iter.map(Vec3::from_array).collect())
        .unwrap_or_default();
    let indices = reader.read_indices().map(|i| i.into_u32().collect());

    Mesh {
        name: None,
        positions,
        indices,
        material: convert_material(&primitive.material()),
        cast_shadow: false,
        receive_shadow: false,
    }
}

fn convert_material(material: &gltf::Material<'_>) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let alpha_mode = material.alpha_mode();
    Material {
        name: material.name().map(str::to_string),
        transparent: alpha_mode == AlphaMode::Blend,
        opacity: pbr.base_color_factor()[3],
        alpha_test: match alpha_mode {
            AlphaMode::Mask => material.alpha_cutoff().unwrap_or(0.5),
            _ => 0.0,
        },
        alpha_to_coverage: false,
        transparent_texture: alpha_mode != AlphaMode::Opaque && pbr.base_color_texture().is_some(),
        depth_write: true,
        emissive: material.emissive_factor(),
        emissive_intensity: 1.0,
    }
}
