//! Accessory collision detection
//!
//! A candidate accessory is fetched as detached geometry, placed with the
//! same transform as live nodes, and probed against every other placed
//! accessory:
//!
//! 1. Broad phase: world-space AABBs that do not touch are skipped.
//! 2. Narrow phase: up to `max_samples` candidate vertices per mesh, taken
//!    at a uniform stride, cast rays along the six axis directions against
//!    the other node's triangles. A hit closer than `proximity_epsilon`
//!    means the pair collides.
//!
//! The first colliding pair in canonical accessory order wins. Any failure
//! on the way (fetch, malformed geometry) resolves to "no collision".

use beebo_core::{ray_triangle_intersect, AccessorySlot, Aabb, Mesh, PartDefinition, Ray, SceneNode, Slot, AXIS_DIRECTIONS};
use glam::{Mat4, Vec3};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::arbiter::RequestToken;
use crate::error::GeometryProbeError;
use crate::loader::ModelLoader;
use crate::registry::PlacedNode;
use crate::settings::CollisionSettings;
use crate::store::AssetStore;

/// One mesh flattened into world space
#[derive(Debug, Clone, PartialEq)]
pub struct WorldMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub bounds: Aabb,
}

impl WorldMesh {
    pub fn from_mesh(mesh: &Mesh, world: Mat4) -> Self {
        let vertices: Vec<Vec3> = mesh
            .positions
            .iter()
            .map(|p| world.transform_point3(*p))
            .collect();
        let bounds = Aabb::from_points(vertices.iter().copied());
        Self {
            vertices,
            triangles: mesh.triangles().collect(),
            bounds,
        }
    }

    /// Every mesh under `root`, with `root` placed under `parent`
    pub fn collect(root: &SceneNode, parent: Mat4) -> Vec<WorldMesh> {
        let mut meshes = Vec::new();
        root.visit_meshes(parent, &mut |mesh, world| {
            meshes.push(WorldMesh::from_mesh(mesh, world));
        });
        meshes
    }

    fn triangle(&self, indices: [u32; 3]) -> Result<[Vec3; 3], GeometryProbeError> {
        let vertex = |i: u32| {
            self.vertices
                .get(i as usize)
                .copied()
                .ok_or(GeometryProbeError::IndexOutOfRange {
                    index: i,
                    vertices: self.vertices.len(),
                })
        };
        Ok([vertex(indices[0])?, vertex(indices[1])?, vertex(indices[2])?])
    }

    /// Whether `ray` hits any triangle closer than `limit`
    fn hit_within(&self, ray: &Ray, limit: f32) -> Result<bool, GeometryProbeError> {
        for indices in &self.triangles {
            let [v0, v1, v2] = self.triangle(*indices)?;
            if let Some(t) = ray_triangle_intersect(ray, v0, v1, v2) {
                if t < limit {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

/// Indices of at most `max_samples` vertices spread uniformly over `count`
pub fn sample_indices(count: usize, max_samples: usize) -> impl Iterator<Item = usize> {
    let max_samples = max_samples.max(1);
    let stride = count.div_ceil(max_samples).max(1);
    (0..count).step_by(stride)
}

/// The accessory a candidate was found to overlap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionHit {
    pub slot: AccessorySlot,
    pub part: PartDefinition,
}

/// Result of a collision check
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollisionOutcome {
    pub has_collision: bool,
    pub colliding_with: Option<CollisionHit>,
}

impl CollisionOutcome {
    pub fn clear() -> Self {
        Self::default()
    }

    pub fn hit(slot: AccessorySlot, part: PartDefinition) -> Self {
        Self {
            has_collision: true,
            colliding_with: Some(CollisionHit { slot, part }),
        }
    }
}

/// Probe counters
#[derive(Debug, Default)]
pub struct ProbeStats {
    probes: AtomicU64,
    geometry_fetches: AtomicU64,
    broad_phase_rejections: AtomicU64,
    rays_cast: AtomicU64,
    fail_open: AtomicU64,
}

impl ProbeStats {
    /// Checks that got past the short-circuits
    pub fn probes(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    pub fn geometry_fetches(&self) -> u64 {
        self.geometry_fetches.load(Ordering::Relaxed)
    }

    /// Pairs skipped because their bounding boxes do not touch
    pub fn broad_phase_rejections(&self) -> u64 {
        self.broad_phase_rejections.load(Ordering::Relaxed)
    }

    pub fn rays_cast(&self) -> u64 {
        self.rays_cast.load(Ordering::Relaxed)
    }

    /// Checks resolved to no-collision because of an error
    pub fn fail_open(&self) -> u64 {
        self.fail_open.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Decides whether a candidate accessory overlaps the placed ones
#[derive(Debug)]
pub struct CollisionDetector {
    enabled: AtomicBool,
    max_samples: usize,
    proximity_epsilon: f32,
    stats: Arc<ProbeStats>,
}

impl CollisionDetector {
    pub fn new(settings: &CollisionSettings) -> Self {
        Self {
            enabled: AtomicBool::new(settings.enabled),
            max_samples: settings.max_samples,
            proximity_epsilon: settings.proximity_epsilon,
            stats: Arc::new(ProbeStats::default()),
        }
    }

    /// When disabled every check resolves to no-collision
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> Arc<ProbeStats> {
        self.stats.clone()
    }

    /// Check `candidate` for the `excluded` slot against `placed`
    ///
    /// Nodes in `excluded` (the slot being replaced) and non-accessory nodes
    /// are ignored. `token`, when given, is polled between pairs; once it is
    /// cancelled the probe stops and reports no collision, since the caller
    /// will discard the result anyway.
    pub async fn check<S: AssetStore>(
        &self,
        loader: &ModelLoader<S>,
        candidate: &PartDefinition,
        excluded: AccessorySlot,
        placed: &[Arc<PlacedNode>],
        token: Option<&RequestToken>,
    ) -> CollisionOutcome {
        let mut others: Vec<&PlacedNode> = placed
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| n.slot().accessory().is_some_and(|a| a != excluded))
            .collect();

        if candidate.is_none() || others.is_empty() || !self.is_enabled() {
            return CollisionOutcome::clear();
        }
        others.sort_by_key(|n| n.slot());
        ProbeStats::bump(&self.stats.probes);

        ProbeStats::bump(&self.stats.geometry_fetches);
        let raw = match loader.fetch_geometry(candidate).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(part = %candidate.id, error = %e, "Collision probe fetch failed, assuming no collision");
                ProbeStats::bump(&self.stats.fail_open);
                return CollisionOutcome::clear();
            }
        };

        // Detached probe geometry, dropped at the end of this call
        let probe = WorldMesh::collect(&raw, loader.placement_transform());
        drop(raw);

        match self.probe(&probe, &others, token) {
            Ok(Some(hit)) => {
                let other = others[hit];
                info!(
                    part = %candidate.id,
                    colliding_with = %other.part().id,
                    slot = %other.slot(),
                    "Collision detected"
                );
                match other.slot() {
                    Slot::Accessory(slot) => CollisionOutcome::hit(slot, other.part().clone()),
                    Slot::Primary(_) => CollisionOutcome::clear(),
                }
            }
            Ok(None) => CollisionOutcome::clear(),
            Err(e) => {
                debug!(part = %candidate.id, error = %e, "Collision probe failed, assuming no collision");
                ProbeStats::bump(&self.stats.fail_open);
                CollisionOutcome::clear()
            }
        }
    }

    /// Index into `others` of the first node the probe touches
    fn probe(
        &self,
        candidate: &[WorldMesh],
        others: &[&PlacedNode],
        token: Option<&RequestToken>,
    ) -> Result<Option<usize>, GeometryProbeError> {
        if candidate.is_empty() {
            return Err(GeometryProbeError::NoMeshes);
        }
        if let Some(index) = candidate.iter().position(|m| m.vertices.is_empty()) {
            return Err(GeometryProbeError::EmptyMesh(index));
        }
        let bounds = candidate
            .iter()
            .fold(Aabb::EMPTY, |acc, m| acc.union(&m.bounds));

        for (index, other) in others.iter().enumerate() {
            if token.is_some_and(|t| t.is_cancelled()) {
                debug!("Collision probe superseded, stopping early");
                return Ok(None);
            }
            if !bounds.intersects(&other.bounds()) {
                ProbeStats::bump(&self.stats.broad_phase_rejections);
                continue;
            }
            if self.touches(candidate, other.world_meshes())? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn touches(&self, candidate: &[WorldMesh], other: &[WorldMesh]) -> Result<bool, GeometryProbeError> {
        for mesh in candidate {
            for i in sample_indices(mesh.vertices.len(), self.max_samples) {
                let origin = mesh.vertices[i];
                for direction in AXIS_DIRECTIONS {
                    ProbeStats::bump(&self.stats.rays_cast);
                    let ray = Ray::new(origin, direction);
                    for target in other {
                        if target.hit_within(&ray, self.proximity_epsilon)? {
                            return Ok(true);
                        }
                    }
                }
            }
        }
        Ok(false)
    }
}
