//! Assembly tuning knobs

use serde::{Deserialize, Serialize};

/// Settings shared by the loader, the collision probe and the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblySettings {
    /// Uniform scale applied to every placed node and every probe
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Disables shadows and dims screen glow
    #[serde(default)]
    pub performance_mode: bool,
    #[serde(default)]
    pub collision: CollisionSettings,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            performance_mode: false,
            collision: CollisionSettings::default(),
        }
    }
}

/// Collision probe parameters
///
/// `max_samples` and `proximity_epsilon` were tuned against the stock
/// low-poly accessory meshes at 0.1 scale; much denser or sparser meshes
/// may need different values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionSettings {
    /// Run collision checks at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum sampled vertices per candidate mesh
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// Hit distance (world units) below which a ray counts as touching
    #[serde(default = "default_proximity_epsilon")]
    pub proximity_epsilon: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_samples: default_max_samples(),
            proximity_epsilon: default_proximity_epsilon(),
        }
    }
}

fn default_scale() -> f32 {
    0.1
}

fn default_true() -> bool {
    true
}

fn default_max_samples() -> usize {
    100
}

fn default_proximity_epsilon() -> f32 {
    0.02
}
