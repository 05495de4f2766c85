//! Model loading and presentation normalization

use beebo_core::{Material, PartDefinition, SceneNode, Slot};
use glam::{Mat4, Vec3};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::progress::{NullProgress, ProgressSink};
use crate::registry::PlacedNode;
use crate::settings::AssemblySettings;
use crate::store::{asset_path, AssetStore};

/// Alpha threshold forced on transparent materials
pub const ALPHA_TEST: f32 = 0.01;

/// Screen glow colour (0x333333)
pub const SCREEN_EMISSIVE: [f32; 3] = [0.2, 0.2, 0.2];

/// Screen glow intensity with and without performance mode
pub const SCREEN_GLOW: f32 = 0.5;
pub const SCREEN_GLOW_PERFORMANCE: f32 = 0.3;

/// Fetches parts from an [`AssetStore`] and turns them into placed nodes
pub struct ModelLoader<S> {
    store: S,
    progress: Arc<dyn ProgressSink>,
    scale: f32,
    performance_mode: AtomicBool,
}

impl<S: AssetStore> ModelLoader<S> {
    pub fn new(store: S, settings: &AssemblySettings) -> Self {
        Self {
            store,
            progress: Arc::new(NullProgress),
            scale: settings.scale,
            performance_mode: AtomicBool::new(settings.performance_mode),
        }
    }

    /// Route load progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Affects nodes loaded from now on
    pub fn set_performance_mode(&self, enabled: bool) {
        self.performance_mode.store(enabled, Ordering::Relaxed);
    }

    pub fn performance_mode(&self) -> bool {
        self.performance_mode.load(Ordering::Relaxed)
    }

    /// Root transform shared by placed nodes and collision probes
    pub fn placement_transform(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.scale))
    }

    /// Raw geometry for a part: fetch and parse only, no progress,
    /// no scaling, no material changes
    pub async fn fetch_geometry(&self, part: &PartDefinition) -> Result<SceneNode, LoadError> {
        let path = part_path(part)?;
        self.store.fetch(&path, &NullProgress).await
    }

    /// Fetch, scale and normalize a part for `slot`
    ///
    /// Always resolves: failures come back as `LoadError` after being
    /// reported to the progress sink and the log.
    pub async fn load(&self, part: &PartDefinition, slot: Slot) -> Result<PlacedNode, LoadError> {
        let (path, fetched) = match part_path(part) {
            Ok(path) => {
                debug!(slot = %slot, part = %part.id, path = %path, "Loading model");
                let fetched = self.store.fetch(&path, self.progress.as_ref()).await;
                (path, fetched)
            }
            Err(e) => (part.id.clone(), Err(e)),
        };

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => {
                warn!(slot = %slot, part = %part.id, error = %e, "Error loading model");
                self.progress.finished(&path, Err(&e));
                return Err(e);
            }
        };

        let mut root = SceneNode::group(self.placement_transform(), vec![raw]);
        let transparent = normalize_materials(&mut root, part.is_screen(), self.performance_mode());
        if transparent {
            debug!(part = %part.id, "Transparent materials detected and configured");
        }

        self.progress.finished(&path, Ok(()));
        info!(slot = %slot, part = %part.id, "Model loaded");
        Ok(PlacedNode::new(part.clone(), slot, root))
    }
}

fn part_path(part: &PartDefinition) -> Result<String, LoadError> {
    part.asset
        .as_deref()
        .map(asset_path)
        .ok_or_else(|| LoadError::NotFound(part.id.clone()))
}

/// Apply shadow flags and the transparency/screen material rules.
/// Returns whether any material ended up transparent.
pub fn normalize_materials(root: &mut SceneNode, is_screen: bool, performance_mode: bool) -> bool {
    let mut transparent_found = false;
    root.for_each_mesh_mut(&mut |mesh| {
        mesh.cast_shadow = !performance_mode;
        mesh.receive_shadow = !performance_mode;

        let material = &mut mesh.material;
        if is_screen {
            force_transparent(material);
            material.emissive = SCREEN_EMISSIVE;
            material.emissive_intensity = if performance_mode {
                SCREEN_GLOW_PERFORMANCE
            } else {
                SCREEN_GLOW
            };
            transparent_found = true;
        } else if material.has_transparency() {
            force_transparent(material);
            transparent_found = true;
        }
    });
    transparent_found
}

fn force_transparent(material: &mut Material) {
    material.transparent = true;
    material.alpha_test = ALPHA_TEST;
    material.depth_write = false;
}
