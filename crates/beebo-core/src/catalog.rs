//! Part catalog - the static registry of selectable parts per slot
//!
//! The catalog is loaded once at startup from TOML. Each primary category
//! lists at least one part; each accessory subcategory starts with the
//! "None" placeholder so that index 0 always means "no accessory".

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::slot::{AccessorySlot, PrimaryCategory, Slot};

/// Catalog shipped with the crate
const BUILTIN_CATALOG: &str = include_str!("../catalog/default.toml");

/// Id of the "None" placeholder part
pub const NONE_ID: &str = "none";

/// Filename prefix marking screen components
const SCREEN_PREFIX: &str = "screen_";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Catalog has no parts for {0}")]
    EmptySlot(Slot),
    #[error("Accessory list {0} must start with a \"None\" entry")]
    MissingNone(AccessorySlot),
    #[error("Duplicate part id {id} in {slot}")]
    DuplicateId { slot: Slot, id: String },
    #[error("No part {name:?} in {slot}")]
    UnknownPart { slot: Slot, name: String },
}

/// A single selectable part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDefinition {
    /// Stable part id (e.g., "accessories_head_beanie")
    pub id: String,
    /// Asset filename under `models/`; absent for the "None" placeholder
    #[serde(default)]
    pub asset: Option<String>,
    /// Human-readable name shown in the carousel
    pub display_name: String,
    /// Price in POL
    #[serde(default)]
    pub price: f64,
}

impl PartDefinition {
    /// The "None" placeholder: no asset, never collides, free
    pub fn none() -> Self {
        Self {
            id: NONE_ID.to_string(),
            asset: None,
            display_name: "None".to_string(),
            price: 0.0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.asset.is_none()
    }

    /// Screen components get forced transparency and glow when loaded
    pub fn is_screen(&self) -> bool {
        self.asset
            .as_deref()
            .is_some_and(|a| a.starts_with(SCREEN_PREFIX))
    }

    /// Price counted towards a total (the placeholder is always free)
    pub fn effective_price(&self) -> f64 {
        if self.is_none() {
            0.0
        } else {
            self.price
        }
    }
}

/// Carousel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Prev,
}

/// Accessory part lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessoryCatalog {
    #[serde(default)]
    pub clothes: Vec<PartDefinition>,
    #[serde(default)]
    pub face: Vec<PartDefinition>,
    #[serde(default)]
    pub head: Vec<PartDefinition>,
}

/// The part catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Version of the catalog format
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub body: Vec<PartDefinition>,
    #[serde(default)]
    pub face: Vec<PartDefinition>,
    #[serde(default)]
    pub screen: Vec<PartDefinition>,
    #[serde(default)]
    pub specs: Vec<PartDefinition>,
    #[serde(default)]
    pub accessories: AccessoryCatalog,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Catalog {
    /// The catalog embedded in the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    /// Load and validate a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml(&content)?;
        debug!(path = %path.display(), parts = catalog.len(), "Loaded part catalog");
        Ok(catalog)
    }

    /// Load and validate a catalog from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check the structural rules every consumer relies on
    pub fn validate(&self) -> Result<(), CatalogError> {
        for slot in Slot::ALL {
            let parts = self.parts(slot);
            if parts.is_empty() {
                return Err(CatalogError::EmptySlot(slot));
            }
            if let Slot::Accessory(accessory) = slot {
                if !parts[0].is_none() {
                    return Err(CatalogError::MissingNone(accessory));
                }
            }
            let mut seen = HashSet::new();
            for part in parts {
                if !seen.insert(part.id.as_str()) {
                    return Err(CatalogError::DuplicateId {
                        slot,
                        id: part.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// All parts for a slot, in carousel order
    pub fn parts(&self, slot: Slot) -> &[PartDefinition] {
        match slot {
            Slot::Primary(PrimaryCategory::Body) => &self.body,
            Slot::Primary(PrimaryCategory::Face) => &self.face,
            Slot::Primary(PrimaryCategory::Screen) => &self.screen,
            Slot::Primary(PrimaryCategory::Specs) => &self.specs,
            Slot::Accessory(AccessorySlot::Clothes) => &self.accessories.clothes,
            Slot::Accessory(AccessorySlot::Face) => &self.accessories.face,
            Slot::Accessory(AccessorySlot::Head) => &self.accessories.head,
        }
    }

    /// Part at `index` for a slot
    pub fn part(&self, slot: Slot, index: usize) -> Option<&PartDefinition> {
        self.parts(slot).get(index)
    }

    /// Find a part index by id or display name (case-insensitive)
    pub fn find(&self, slot: Slot, name: &str) -> Result<usize, CatalogError> {
        self.parts(slot)
            .iter()
            .position(|p| p.id.eq_ignore_ascii_case(name) || p.display_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CatalogError::UnknownPart {
                slot,
                name: name.to_string(),
            })
    }

    /// Neighbouring index in the carousel, wrapping at both ends
    pub fn step(&self, slot: Slot, index: usize, direction: Direction) -> usize {
        let len = self.parts(slot).len();
        if len == 0 {
            return 0;
        }
        let index = index % len;
        match direction {
            Direction::Next => (index + 1) % len,
            Direction::Prev => (index + len - 1) % len,
        }
    }

    /// Total number of parts across all slots
    pub fn len(&self) -> usize {
        Slot::ALL.iter().map(|s| self.parts(*s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
[[body]]
id = "body_white"
asset = "body_white.glb"
display_name = "White"
price = 5.0

[[face]]
id = "face_smile"
asset = "face_smile.glb"
display_name = "Smile"
price = 1.0

[[screen]]
id = "screen_green"
asset = "screen_green.glb"
display_name = "Green"
price = 2.0

[[specs]]
id = "specs_1core2gb"
asset = "specs_1core2gb.glb"
display_name = "1 Core 2GB"
price = 1.0

[[accessories.clothes]]
id = "none"
display_name = "None"

[[accessories.clothes]]
id = "accessories_clothes_coat"
asset = "accessories_clothes_coat.glb"
display_name = "Coat"
price = 4.0

[[accessories.face]]
id = "none"
display_name = "None"

[[accessories.head]]
id = "none"
display_name = "None"
"#;

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.parts(Slot::BODY).len(), 4);
        assert_eq!(catalog.parts(Slot::SCREEN).len(), 2);
        assert_eq!(catalog.parts(Slot::CLOTHES).len(), 12);
        assert_eq!(catalog.parts(Slot::FACE_ACCESSORY).len(), 4);
        assert_eq!(catalog.parts(Slot::HEAD).len(), 18);
        for accessory in AccessorySlot::ALL {
            assert!(catalog.part(accessory.into(), 0).unwrap().is_none());
        }
        let beanie = catalog.find(Slot::HEAD, "Beanie").unwrap();
        assert_eq!(
            catalog.part(Slot::HEAD, beanie).unwrap().asset.as_deref(),
            Some("accessories_head_beanie.glb")
        );
    }

    #[test]
    fn test_minimal_catalog() {
        let catalog = Catalog::from_toml(MINIMAL).unwrap();
        assert_eq!(catalog.version, "1.0");
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.find(Slot::CLOTHES, "coat").unwrap(), 1);
        assert_eq!(catalog.find(Slot::CLOTHES, "accessories_clothes_coat").unwrap(), 1);
        assert!(matches!(
            catalog.find(Slot::CLOTHES, "Cloak"),
            Err(CatalogError::UnknownPart { .. })
        ));
    }

    #[test]
    fn test_accessories_require_none_first() {
        let broken = MINIMAL.replacen(
            "[[accessories.head]]\nid = \"none\"\ndisplay_name = \"None\"",
            "[[accessories.head]]\nid = \"hat\"\nasset = \"hat.glb\"\ndisplay_name = \"Hat\"",
            1,
        );
        assert!(matches!(
            Catalog::from_toml(&broken),
            Err(CatalogError::MissingNone(AccessorySlot::Head))
        ));
    }

    #[test]
    fn test_empty_slot_rejected() {
        let broken = MINIMAL.replace("[[specs]]", "[[unused]]");
        assert!(matches!(
            Catalog::from_toml(&broken),
            Err(CatalogError::EmptySlot(Slot::SPECS))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let broken = MINIMAL.replace("id = \"accessories_clothes_coat\"", "id = \"none\"");
        assert!(matches!(
            Catalog::from_toml(&broken),
            Err(CatalogError::DuplicateId { .. })
        ));
    }

    #[test]
    fn test_step_wraps() {
        let catalog = Catalog::builtin().unwrap();
        let len = catalog.parts(Slot::HEAD).len();
        assert_eq!(catalog.step(Slot::HEAD, 0, Direction::Prev), len - 1);
        assert_eq!(catalog.step(Slot::HEAD, len - 1, Direction::Next), 0);
        assert_eq!(catalog.step(Slot::HEAD, 3, Direction::Next), 4);
        assert_eq!(catalog.step(Slot::SCREEN, 1, Direction::Next), 0);
    }

    #[test]
    fn test_part_flags() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.part(Slot::SCREEN, 0).unwrap().is_screen());
        assert!(!catalog.part(Slot::BODY, 0).unwrap().is_screen());
        let none = PartDefinition::none();
        assert!(none.is_none());
        assert_eq!(none.effective_price(), 0.0);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let catalog = Catalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.parts(Slot::CLOTHES)[1].display_name, "Coat");
    }
}
