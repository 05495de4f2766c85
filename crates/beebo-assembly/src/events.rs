//! State-change events published to UI shells

use beebo_core::Slot;
use serde::Serialize;

use crate::state::SlotState;

/// Event channel capacity
pub const EVENT_CAPACITY: usize = 100;

/// Assembly event sent to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssemblyEvent {
    /// Selection index changed; sent before any load or check resolves
    SelectionChanged { slot: Slot, index: usize },
    /// A slot moved to a new lifecycle state
    SlotChanged { slot: Slot, state: SlotState },
    /// A selected accessory is withheld
    CollisionWarning {
        slot: Slot,
        item: String,
        colliding_with: String,
        message: String,
    },
    CollisionWarningCleared,
    /// Number of loads in flight (drives the loading overlay)
    LoadingChanged { pending: usize },
    /// Full reset finished clearing state
    Reset,
}

impl AssemblyEvent {
    pub fn collision_warning(slot: Slot, item: &str, colliding_with: &str) -> Self {
        AssemblyEvent::CollisionWarning {
            slot,
            item: item.to_string(),
            colliding_with: colliding_with.to_string(),
            message: collision_message(item, colliding_with),
        }
    }
}

/// Text shown in the collision warning box
pub fn collision_message(item: &str, colliding_with: &str) -> String {
    format!(
        "Item \"{}\" collides with \"{}\". Please choose something else.",
        item, colliding_with
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_message() {
        assert_eq!(
            collision_message("Cloak", "Beanie"),
            "Item \"Cloak\" collides with \"Beanie\". Please choose something else."
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = AssemblyEvent::SlotChanged {
            slot: Slot::HEAD,
            state: SlotState::Withheld {
                colliding_with: "Cloak".to_string(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "slot_changed");
        assert_eq!(json["slot"], "accessories-head");
        assert_eq!(json["state"]["state"], "withheld");
        assert_eq!(json["state"]["colliding_with"], "Cloak");
    }
}
