//! Placed scene nodes per slot

use beebo_core::{AccessorySlot, Aabb, PartDefinition, SceneNode, Slot};
use glam::Mat4;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::collision::WorldMesh;

/// A loaded, scaled and material-normalized model occupying one slot
///
/// World-space geometry is computed once at construction; placed nodes
/// never move afterwards.
#[derive(Debug, Clone)]
pub struct PlacedNode {
    part: PartDefinition,
    slot: Slot,
    root: SceneNode,
    bounds: Aabb,
    world_meshes: Vec<WorldMesh>,
}

impl PlacedNode {
    pub fn new(part: PartDefinition, slot: Slot, root: SceneNode) -> Self {
        let world_meshes = WorldMesh::collect(&root, Mat4::IDENTITY);
        let bounds = world_meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, m| acc.union(&m.bounds));
        Self {
            part,
            slot,
            root,
            bounds,
            world_meshes,
        }
    }

    /// The part this node materializes
    pub fn part(&self) -> &PartDefinition {
        &self.part
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn root(&self) -> &SceneNode {
        &self.root
    }

    /// World-space bounds of all meshes
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn world_meshes(&self) -> &[WorldMesh] {
        &self.world_meshes
    }

    /// Whether any mesh casts or receives shadows
    pub fn has_shadows(&self) -> bool {
        let mut shadows = false;
        self.root.visit_meshes(Mat4::IDENTITY, &mut |mesh, _| {
            shadows |= mesh.cast_shadow || mesh.receive_shadow;
        });
        shadows
    }

    /// Set cast and receive shadow flags on every mesh
    pub fn set_shadows(&mut self, enabled: bool) {
        self.root.for_each_mesh_mut(&mut |mesh| {
            mesh.cast_shadow = enabled;
            mesh.receive_shadow = enabled;
        });
    }

    /// A copy of this node with its shadow flags set to `enabled`
    pub fn with_shadows(&self, enabled: bool) -> PlacedNode {
        let mut node = self.clone();
        node.set_shadows(enabled);
        node
    }
}

/// Slot -> placed node. Only the coordinator mutates it.
#[derive(Debug, Default)]
pub struct SceneModelRegistry {
    nodes: BTreeMap<Slot, Arc<PlacedNode>>,
}

impl SceneModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a node in its slot, returning the node it replaced
    pub fn place(&mut self, node: PlacedNode) -> Option<Arc<PlacedNode>> {
        self.nodes.insert(node.slot(), Arc::new(node))
    }

    pub fn remove(&mut self, slot: Slot) -> Option<Arc<PlacedNode>> {
        self.nodes.remove(&slot)
    }

    pub fn get(&self, slot: Slot) -> Option<&Arc<PlacedNode>> {
        self.nodes.get(&slot)
    }

    /// Whether `slot` currently shows the part with id `part_id`
    pub fn is_placed(&self, slot: Slot, part_id: &str) -> bool {
        self.nodes.get(&slot).is_some_and(|n| n.part().id == part_id)
    }

    /// Placed accessories in canonical order, skipping `excluded`
    pub fn accessories_except(&self, excluded: Option<AccessorySlot>) -> Vec<Arc<PlacedNode>> {
        AccessorySlot::ALL
            .into_iter()
            .filter(|a| Some(*a) != excluded)
            .filter_map(|a| self.nodes.get(&Slot::Accessory(a)).cloned())
            .collect()
    }

    /// Placed nodes in canonical slot order
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<PlacedNode>> {
        self.nodes.values()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Occupied slots with the id of the part shown
    pub fn placed_ids(&self) -> BTreeMap<Slot, String> {
        self.nodes
            .iter()
            .map(|(slot, node)| (*slot, node.part().id.clone()))
            .collect()
    }
}
