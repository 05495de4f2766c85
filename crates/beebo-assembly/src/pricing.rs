//! Price breakdown for the current selection

use beebo_core::{Catalog, PrimaryCategory, Slot};
use serde::Serialize;

use crate::state::{CollisionState, CurrentSelection};

/// One line of the breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceLine {
    pub slot: Slot,
    /// "Body", "Face", ... for primaries, "Accessory (Head)" for accessories
    pub label: String,
    pub display_name: String,
    pub price: f64,
    /// False for withheld accessories, which do not count towards the total
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub lines: Vec<PriceLine>,
    pub total: f64,
}

/// Price the selection. Withheld accessories are listed but contribute
/// zero; "None" accessories are omitted.
pub fn quote(catalog: &Catalog, selection: &CurrentSelection, collisions: &CollisionState) -> Quote {
    let mut lines = Vec::new();

    for category in PrimaryCategory::ALL {
        let slot = Slot::Primary(category);
        if let Some(part) = catalog.part(slot, selection.get(slot)) {
            lines.push(PriceLine {
                slot,
                label: title_case(category.as_str()),
                display_name: part.display_name.clone(),
                price: part.effective_price(),
                active: true,
            });
        }
    }

    for slot in Slot::ALL {
        let Some(accessory) = slot.accessory() else {
            continue;
        };
        let Some(part) = catalog.part(slot, selection.get(slot)) else {
            continue;
        };
        if part.is_none() {
            continue;
        }
        lines.push(PriceLine {
            slot,
            label: format!("Accessory ({})", accessory.title()),
            display_name: part.display_name.clone(),
            price: part.effective_price(),
            active: !collisions.get(accessory),
        });
    }

    let total = lines.iter().filter(|l| l.active).map(|l| l.price).sum();
    Quote { lines, total }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
