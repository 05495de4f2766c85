//! The assembly coordinator
//!
//! `Assembler` is the single writer of [`AssemblyState`]. Every entry point
//! takes `&self` so a UI shell can run several of them concurrently on one
//! task; correctness under interleaving comes from the request tokens, not
//! from the lock. The state lock is only held between awaits, never across
//! asset I/O or a collision probe.

use beebo_core::{AccessorySlot, Catalog, Direction, PartDefinition, PrimaryCategory, Slot};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::arbiter::RequestToken;
use crate::collision::CollisionDetector;
use crate::error::{AssemblyError, LoadError};
use crate::events::{AssemblyEvent, EVENT_CAPACITY};
use crate::loader::ModelLoader;
use crate::pricing::{self, Quote};
use crate::progress::ProgressSink;
use crate::registry::PlacedNode;
use crate::settings::AssemblySettings;
use crate::state::{AssemblySnapshot, AssemblyState, SlotState};
use crate::store::AssetStore;

/// How a selection request ended
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// The part is loaded and shown
    Placed,
    /// "None" was selected; the slot is empty
    Cleared,
    /// The part collides with a placed accessory and is not shown
    Withheld { colliding_with: PartDefinition },
    /// A newer request for the slot took over; nothing was changed
    Superseded,
    /// The load failed; the slot is left empty
    Failed(LoadError),
}

/// Coordinates selections, collision checks, loads and reconciliation
pub struct Assembler<S> {
    catalog: Arc<Catalog>,
    loader: ModelLoader<S>,
    detector: CollisionDetector,
    state: Mutex<AssemblyState>,
    event_tx: broadcast::Sender<AssemblyEvent>,
}

impl<S: AssetStore> Assembler<S> {
    pub fn new(catalog: Arc<Catalog>, store: S, settings: &AssemblySettings) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog,
            loader: ModelLoader::new(store, settings),
            detector: CollisionDetector::new(&settings.collision),
            state: Mutex::new(AssemblyState::new()),
            event_tx,
        }
    }

    /// Route load progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.loader = self.loader.with_progress(progress);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn loader(&self) -> &ModelLoader<S> {
        &self.loader
    }

    pub fn detector(&self) -> &CollisionDetector {
        &self.detector
    }

    /// Subscribe to assembly events
    pub fn subscribe(&self) -> broadcast::Receiver<AssemblyEvent> {
        self.event_tx.subscribe()
    }

    pub async fn snapshot(&self) -> AssemblySnapshot {
        self.state.lock().await.snapshot(&self.catalog)
    }

    /// The node shown in `slot`, if any
    pub async fn placed(&self, slot: Slot) -> Option<Arc<PlacedNode>> {
        self.state.lock().await.registry.get(slot).cloned()
    }

    /// Every node shown, in canonical slot order
    pub async fn placed_nodes(&self) -> Vec<Arc<PlacedNode>> {
        self.state.lock().await.registry.nodes().cloned().collect()
    }

    /// Price breakdown of the current selection
    pub async fn quote(&self) -> Quote {
        let state = self.state.lock().await;
        pricing::quote(&self.catalog, &state.selection, &state.collisions)
    }

    /// Load index 0 of every primary category concurrently
    pub async fn place_defaults(&self) {
        let requests: Vec<(Slot, PartDefinition, RequestToken)> = {
            let mut state = self.state.lock().await;
            let mut requests = Vec::new();
            for category in PrimaryCategory::ALL {
                let slot = Slot::Primary(category);
                state.selection.set(slot, 0);
                self.emit(AssemblyEvent::SelectionChanged { slot, index: 0 });
                state.registry.remove(slot);
                match self.catalog.part(slot, 0) {
                    Some(part) if !part.is_none() => {
                        let token = state.arbiter.issue(slot);
                        requests.push((slot, part.clone(), token));
                    }
                    _ => {
                        state.arbiter.invalidate(slot);
                        self.transition(&mut state, slot, SlotState::Empty);
                    }
                }
            }
            requests
        };

        info!(count = requests.len(), "Placing default parts");
        join_all(
            requests
                .into_iter()
                .map(|(slot, part, token)| async move { self.load_into(slot, &part, token).await }),
        )
        .await;
        self.reconcile_all().await;
    }

    /// Select the part at `index` for `slot`
    ///
    /// The selection is recorded before anything else so readers see it
    /// immediately. Resolves once the request is placed, withheld, cleared,
    /// failed or superseded by a newer one.
    pub async fn select(&self, slot: Slot, index: usize) -> Result<SelectOutcome, AssemblyError> {
        let part = self
            .catalog
            .part(slot, index)
            .cloned()
            .ok_or(AssemblyError::IndexOutOfRange {
                slot,
                index,
                len: self.catalog.parts(slot).len(),
            })?;

        self.state.lock().await.selection.set(slot, index);
        self.emit(AssemblyEvent::SelectionChanged { slot, index });
        debug!(slot = %slot, index, part = %part.id, "Selection changed");

        let outcome = match slot {
            Slot::Primary(_) => self.select_primary(slot, part).await,
            Slot::Accessory(accessory) => self.select_accessory(accessory, part).await,
        };
        Ok(outcome)
    }

    /// Select a part by id or display name
    pub async fn select_by_name(&self, slot: Slot, name: &str) -> Result<SelectOutcome, AssemblyError> {
        let index = self
            .catalog
            .find(slot, name)
            .map_err(|_| AssemblyError::UnknownPart {
                slot,
                name: name.to_string(),
            })?;
        self.select(slot, index).await
    }

    /// Carousel arrow: select the neighbour of the current part
    pub async fn step(&self, slot: Slot, direction: Direction) -> Result<SelectOutcome, AssemblyError> {
        let current = self.state.lock().await.selection.get(slot);
        let index = self.catalog.step(slot, current, direction);
        self.select(slot, index).await
    }

    async fn select_primary(&self, slot: Slot, part: PartDefinition) -> SelectOutcome {
        let token = {
            let mut state = self.state.lock().await;
            state.registry.remove(slot);
            if part.is_none() {
                state.arbiter.invalidate(slot);
                self.transition(&mut state, slot, SlotState::Empty);
                None
            } else {
                Some(state.arbiter.issue(slot))
            }
        };

        let outcome = match token {
            Some(token) => self.load_into(slot, &part, token).await,
            None => SelectOutcome::Cleared,
        };
        if outcome != SelectOutcome::Superseded {
            self.reconcile_all().await;
        }
        outcome
    }

    async fn select_accessory(&self, accessory: AccessorySlot, part: PartDefinition) -> SelectOutcome {
        let slot = Slot::Accessory(accessory);

        if part.is_none() {
            {
                let mut state = self.state.lock().await;
                state.arbiter.invalidate(slot);
                state.registry.remove(slot);
                state.collisions.set(accessory, false);
                self.transition(&mut state, slot, SlotState::Empty);
            }
            self.emit(AssemblyEvent::CollisionWarningCleared);
            self.reconcile_all().await;
            return SelectOutcome::Cleared;
        }

        let (token, placed, replaced) = {
            let mut state = self.state.lock().await;
            let token = state.arbiter.issue(slot);
            let replaced = state.registry.remove(slot).is_some();
            self.transition(&mut state, slot, SlotState::Loading);
            (token, state.registry.accessories_except(Some(accessory)), replaced)
        };

        let outcome = self
            .detector
            .check(&self.loader, &part, accessory, &placed, Some(&token))
            .await;
        drop(placed);

        {
            let mut state = self.state.lock().await;
            if !state.arbiter.is_current(&token) {
                debug!(slot = %slot, part = %part.id, "Discarding stale collision result");
                return SelectOutcome::Superseded;
            }
            match outcome.colliding_with {
                Some(hit) if outcome.has_collision => {
                    info!(
                        slot = %slot,
                        part = %part.id,
                        colliding_with = %hit.part.id,
                        "Withholding colliding accessory"
                    );
                    state.collisions.set(accessory, true);
                    self.transition(
                        &mut state,
                        slot,
                        SlotState::Withheld {
                            colliding_with: hit.part.display_name.clone(),
                        },
                    );
                    drop(state);
                    self.emit(AssemblyEvent::collision_warning(
                        slot,
                        &part.display_name,
                        &hit.part.display_name,
                    ));
                    // The node this request replaced may have been blocking another accessory
                    if replaced {
                        self.reconcile_all().await;
                    }
                    return SelectOutcome::Withheld {
                        colliding_with: hit.part,
                    };
                }
                _ => state.collisions.set(accessory, false),
            }
        }
        self.emit(AssemblyEvent::CollisionWarningCleared);

        let outcome = self.load_into(slot, &part, token).await;
        if outcome != SelectOutcome::Superseded {
            self.reconcile_all().await;
        }
        outcome
    }

    /// Load `part` and place it if `token` is still current when it resolves
    async fn load_into(&self, slot: Slot, part: &PartDefinition, token: RequestToken) -> SelectOutcome {
        {
            let mut state = self.state.lock().await;
            if !state.arbiter.is_current(&token) {
                return SelectOutcome::Superseded;
            }
            let pending = state.begin_load();
            self.transition(&mut state, slot, SlotState::Loading);
            self.emit(AssemblyEvent::LoadingChanged { pending });
        }

        let result = self.loader.load(part, slot).await;

        let mut state = self.state.lock().await;
        let pending = state.end_load();
        self.emit(AssemblyEvent::LoadingChanged { pending });

        if !state.arbiter.is_current(&token) {
            debug!(slot = %slot, part = %part.id, "Discarding stale load result");
            return SelectOutcome::Superseded;
        }

        match result {
            Ok(mut node) => {
                // The mode may have flipped while the fetch was in flight
                node.set_shadows(!self.loader.performance_mode());
                state.registry.place(node);
                self.transition(&mut state, slot, SlotState::Placed);
                SelectOutcome::Placed
            }
            Err(e) => {
                state.registry.remove(slot);
                self.transition(
                    &mut state,
                    slot,
                    SlotState::Failed {
                        message: e.to_string(),
                    },
                );
                SelectOutcome::Failed(e)
            }
        }
    }

    /// Re-evaluate every accessory slot against the placed ones
    ///
    /// Phase one checks every selected, unplaced accessory against the
    /// scene as it stands; phase two loads all that came out clear. Slots
    /// with a request in flight and slots whose load failed are left alone.
    pub async fn reconcile_all(&self) {
        let mut needs_load: Vec<(AccessorySlot, usize, PartDefinition)> = Vec::new();

        for accessory in AccessorySlot::ALL {
            let slot = Slot::Accessory(accessory);
            let (index, part, placed) = {
                let mut state = self.state.lock().await;
                let index = state.selection.get(slot);
                let Some(part) = self.catalog.part(slot, index).cloned() else {
                    continue;
                };
                if part.is_none() || state.registry.is_placed(slot, &part.id) {
                    state.collisions.set(accessory, false);
                    continue;
                }
                if matches!(state.slot_state(slot), SlotState::Loading | SlotState::Failed { .. }) {
                    continue;
                }
                (index, part, state.registry.accessories_except(Some(accessory)))
            };

            let outcome = self
                .detector
                .check(&self.loader, &part, accessory, &placed, None)
                .await;

            let mut state = self.state.lock().await;
            if state.selection.get(slot) != index
                || state.registry.is_placed(slot, &part.id)
                || state.slot_state(slot) == SlotState::Loading
            {
                continue;
            }
            match outcome.colliding_with {
                Some(hit) if outcome.has_collision => {
                    state.collisions.set(accessory, true);
                    self.transition(
                        &mut state,
                        slot,
                        SlotState::Withheld {
                            colliding_with: hit.part.display_name,
                        },
                    );
                }
                _ => {
                    if state.collisions.get(accessory) {
                        info!(slot = %slot, part = %part.id, "Collision resolved");
                    }
                    state.collisions.set(accessory, false);
                    needs_load.push((accessory, index, part));
                }
            }
        }

        let loads: Vec<(Slot, PartDefinition, RequestToken)> = {
            let mut state = self.state.lock().await;
            let mut loads = Vec::new();
            for (accessory, index, part) in needs_load {
                let slot = Slot::Accessory(accessory);
                if state.selection.get(slot) != index || state.slot_state(slot) == SlotState::Loading {
                    continue;
                }
                let token = state.arbiter.issue(slot);
                loads.push((slot, part, token));
            }
            loads
        };

        if !loads.is_empty() {
            debug!(count = loads.len(), "Loading reconciled accessories");
        }
        join_all(
            loads
                .into_iter()
                .map(|(slot, part, token)| async move { self.load_into(slot, &part, token).await }),
        )
        .await;

        if !self.state.lock().await.collisions.any() {
            self.emit(AssemblyEvent::CollisionWarningCleared);
        }
    }

    /// Back to the default assembly: every selection at index 0, nothing
    /// withheld, no accessories, default primaries reloaded
    pub async fn reset_all(&self) {
        {
            let mut state = self.state.lock().await;
            state.arbiter.invalidate_all();
            state.selection.reset();
            state.collisions.clear();
            state.registry.clear();
            for slot in Slot::ALL {
                self.transition(&mut state, slot, SlotState::Empty);
            }
        }
        info!("Assembly reset");
        self.emit(AssemblyEvent::Reset);
        self.emit(AssemblyEvent::CollisionWarningCleared);
        self.place_defaults().await;
    }

    /// Turn collision checks on or off, then reconcile
    ///
    /// With checks off every withheld accessory gets loaded. Turning them
    /// back on does not re-check accessories that are already placed.
    pub async fn set_collision_checks(&self, enabled: bool) {
        self.detector.set_enabled(enabled);
        info!(enabled, "Collision checks toggled");
        self.reconcile_all().await;
    }

    /// Switch shadows off (or back on) for every placed node and every
    /// part loaded from now on
    pub async fn set_performance_mode(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        self.loader.set_performance_mode(enabled);
        let nodes: Vec<PlacedNode> = state
            .registry
            .nodes()
            .map(|node| node.with_shadows(!enabled))
            .collect();
        for node in nodes {
            state.registry.place(node);
        }
        info!(enabled, "Performance mode toggled");
    }

    fn transition(&self, state: &mut AssemblyState, slot: Slot, new_state: SlotState) {
        if state.set_slot_state(slot, new_state.clone()) {
            self.emit(AssemblyEvent::SlotChanged {
                slot,
                state: new_state,
            });
        }
    }

    fn emit(&self, event: AssemblyEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
