//! Placement slots for robot parts
//!
//! A slot is either one of the four primary categories, which always hold
//! exactly one part, or one of the three accessory subcategories, which hold
//! at most one non-"None" part and take part in collision checks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Primary body categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryCategory {
    Body,
    Face,
    Screen,
    Specs,
}

impl PrimaryCategory {
    pub const ALL: [PrimaryCategory; 4] = [Self::Body, Self::Face, Self::Screen, Self::Specs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "body",
            Self::Face => "face",
            Self::Screen => "screen",
            Self::Specs => "specs",
        }
    }
}

/// Accessory subcategories
///
/// The declaration order is the canonical collision scan order: when a
/// candidate overlaps several placed accessories, the first one in this
/// order is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessorySlot {
    Clothes,
    Face,
    Head,
}

impl AccessorySlot {
    /// Canonical scan order: clothes, face, head
    pub const ALL: [AccessorySlot; 3] = [Self::Clothes, Self::Face, Self::Head];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clothes => "clothes",
            Self::Face => "face",
            Self::Head => "head",
        }
    }

    /// Label used in price breakdowns ("Clothes", "Face", "Head")
    pub fn title(&self) -> &'static str {
        match self {
            Self::Clothes => "Clothes",
            Self::Face => "Face",
            Self::Head => "Head",
        }
    }
}

/// A placement target for exactly one part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Primary(PrimaryCategory),
    Accessory(AccessorySlot),
}

impl Slot {
    pub const BODY: Slot = Slot::Primary(PrimaryCategory::Body);
    pub const FACE: Slot = Slot::Primary(PrimaryCategory::Face);
    pub const SCREEN: Slot = Slot::Primary(PrimaryCategory::Screen);
    pub const SPECS: Slot = Slot::Primary(PrimaryCategory::Specs);
    pub const CLOTHES: Slot = Slot::Accessory(AccessorySlot::Clothes);
    pub const FACE_ACCESSORY: Slot = Slot::Accessory(AccessorySlot::Face);
    pub const HEAD: Slot = Slot::Accessory(AccessorySlot::Head);

    /// Every slot, primaries first, accessories in canonical order
    pub const ALL: [Slot; 7] = [
        Self::BODY,
        Self::FACE,
        Self::SCREEN,
        Self::SPECS,
        Self::CLOTHES,
        Self::FACE_ACCESSORY,
        Self::HEAD,
    ];

    pub fn is_accessory(&self) -> bool {
        matches!(self, Slot::Accessory(_))
    }

    pub fn accessory(&self) -> Option<AccessorySlot> {
        match self {
            Slot::Accessory(a) => Some(*a),
            Slot::Primary(_) => None,
        }
    }
}

impl From<PrimaryCategory> for Slot {
    fn from(category: PrimaryCategory) -> Self {
        Slot::Primary(category)
    }
}

impl From<AccessorySlot> for Slot {
    fn from(accessory: AccessorySlot) -> Self {
        Slot::Accessory(accessory)
    }
}

/// Slot keys follow the carousel naming: `body`, `face`, ...,
/// `accessories-clothes`, `accessories-face`, `accessories-head`.
impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Primary(p) => write!(f, "{}", p.as_str()),
            Slot::Accessory(a) => write!(f, "accessories-{}", a.as_str()),
        }
    }
}

impl fmt::Display for AccessorySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PrimaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown slot: {0}")]
pub struct UnknownSlot(pub String);

impl FromStr for Slot {
    type Err = UnknownSlot;

    /// Accepts the display keys plus the short accessory names `clothes`
    /// and `head`. A bare `face` is the primary face.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "body" => Ok(Self::BODY),
            "face" => Ok(Self::FACE),
            "screen" => Ok(Self::SCREEN),
            "specs" => Ok(Self::SPECS),
            "accessories-clothes" | "clothes" => Ok(Self::CLOTHES),
            "accessories-face" => Ok(Self::FACE_ACCESSORY),
            "accessories-head" | "head" => Ok(Self::HEAD),
            _ => Err(UnknownSlot(s.to_string())),
        }
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}
