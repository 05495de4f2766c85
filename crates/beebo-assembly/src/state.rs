//! Assembly state owned by the coordinator

use beebo_core::{AccessorySlot, Catalog, Slot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::arbiter::RequestArbiter;
use crate::registry::SceneModelRegistry;

/// Slot -> selected part index. Unset slots read as index 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CurrentSelection {
    indices: BTreeMap<Slot, usize>,
}

impl CurrentSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> usize {
        self.indices.get(&slot).copied().unwrap_or(0)
    }

    pub fn set(&mut self, slot: Slot, index: usize) {
        self.indices.insert(slot, index);
    }

    /// Every slot back to index 0
    pub fn reset(&mut self) {
        self.indices.clear();
    }

    /// Index for every slot, including unset ones
    pub fn all(&self) -> BTreeMap<Slot, usize> {
        Slot::ALL.iter().map(|s| (*s, self.get(*s))).collect()
    }
}

/// Accessory slot -> withheld because of a collision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollisionState {
    pub clothes: bool,
    pub face: bool,
    pub head: bool,
}

impl CollisionState {
    pub fn get(&self, slot: AccessorySlot) -> bool {
        match slot {
            AccessorySlot::Clothes => self.clothes,
            AccessorySlot::Face => self.face,
            AccessorySlot::Head => self.head,
        }
    }

    pub fn set(&mut self, slot: AccessorySlot, colliding: bool) {
        match slot {
            AccessorySlot::Clothes => self.clothes = colliding,
            AccessorySlot::Face => self.face = colliding,
            AccessorySlot::Head => self.head = colliding,
        }
    }

    pub fn any(&self) -> bool {
        self.clothes || self.face || self.head
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Lifecycle of one slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    #[default]
    Empty,
    Loading,
    Placed,
    /// Selected but not shown: it collides with a placed accessory
    Withheld { colliding_with: String },
    Failed { message: String },
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Empty => write!(f, "empty"),
            SlotState::Loading => write!(f, "loading"),
            SlotState::Placed => write!(f, "placed"),
            SlotState::Withheld { colliding_with } => {
                write!(f, "withheld (collides with {})", colliding_with)
            }
            SlotState::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

/// Everything the coordinator mutates
#[derive(Debug, Default)]
pub struct AssemblyState {
    pub selection: CurrentSelection,
    pub collisions: CollisionState,
    pub registry: SceneModelRegistry,
    pub arbiter: RequestArbiter,
    pub slots: BTreeMap<Slot, SlotState>,
    pub pending_loads: usize,
}

impl AssemblyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot_state(&self, slot: Slot) -> SlotState {
        self.slots.get(&slot).cloned().unwrap_or_default()
    }

    /// Returns false when the state did not change
    pub fn set_slot_state(&mut self, slot: Slot, state: SlotState) -> bool {
        if self.slot_state(slot) == state {
            return false;
        }
        self.slots.insert(slot, state);
        true
    }

    pub fn begin_load(&mut self) -> usize {
        self.pending_loads += 1;
        self.pending_loads
    }

    pub fn end_load(&mut self) -> usize {
        self.pending_loads = self.pending_loads.saturating_sub(1);
        self.pending_loads
    }

    pub fn snapshot(&self, catalog: &Catalog) -> AssemblySnapshot {
        let mut slots = BTreeMap::new();
        for slot in Slot::ALL {
            let index = self.selection.get(slot);
            slots.insert(
                slot,
                SlotSnapshot {
                    index,
                    part: catalog.part(slot, index).map(|p| p.id.clone()),
                    display_name: catalog
                        .part(slot, index)
                        .map(|p| p.display_name.clone())
                        .unwrap_or_default(),
                    state: self.slot_state(slot),
                },
            );
        }
        AssemblySnapshot {
            slots,
            collisions: self.collisions,
            placed: self.registry.placed_ids(),
            pending_loads: self.pending_loads,
        }
    }
}

/// One slot as seen by a UI reader
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotSnapshot {
    pub index: usize,
    pub part: Option<String>,
    pub display_name: String,
    #[serde(flatten)]
    pub state: SlotState,
}

/// Read-only copy of the assembly for UI readers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssemblySnapshot {
    pub slots: BTreeMap<Slot, SlotSnapshot>,
    pub collisions: CollisionState,
    pub placed: BTreeMap<Slot, String>,
    pub pending_loads: usize,
}

impl AssemblySnapshot {
    /// Carousel label: the display name, or `Error: <name>` after a failed load
    pub fn label(&self, slot: Slot) -> String {
        match self.slots.get(&slot) {
            Some(s) => match s.state {
                SlotState::Failed { .. } => format!("Error: {}", s.display_name),
                _ => s.display_name.clone(),
            },
            None => String::new(),
        }
    }

    pub fn state(&self, slot: Slot) -> SlotState {
        self.slots
            .get(&slot)
            .map(|s| s.state.clone())
            .unwrap_or_default()
    }

    pub fn index(&self, slot: Slot) -> usize {
        self.slots.get(&slot).map(|s| s.index).unwrap_or(0)
    }

    /// Only primary parts placed, no accessories
    pub fn is_default(&self) -> bool {
        Slot::ALL.iter().all(|s| self.index(*s) == 0)
            && !self.collisions.any()
            && self.placed.keys().all(|s| !s.is_accessory())
    }
}
