//! Beebo Assembly - Accessory collision detection and model-loading orchestration
//!
//! This crate turns catalog selections into placed models:
//! - Asset stores for GLB/glTF files and in-memory scene graphs
//! - Model loading with presentation normalization (scale, shadows, materials)
//! - Latest-wins request tokens per slot
//! - Vertex-sampling ray-proximity collision checks between accessories
//! - The assembler coordinating selections, reconciliation and reset

pub mod arbiter;
pub mod assembler;
pub mod collision;
pub mod error;
pub mod events;
pub mod loader;
pub mod pricing;
pub mod progress;
pub mod registry;
pub mod settings;
pub mod state;
pub mod store;

pub use arbiter::{RequestArbiter, RequestToken};
pub use assembler::{Assembler, SelectOutcome};
pub use collision::{CollisionDetector, CollisionHit, CollisionOutcome, ProbeStats, WorldMesh};
pub use error::{AssemblyError, GeometryProbeError, LoadError};
pub use events::AssemblyEvent;
pub use loader::ModelLoader;
pub use pricing::{PriceLine, Quote};
pub use progress::{NullProgress, ProgressSink, TracingProgress};
pub use registry::{PlacedNode, SceneModelRegistry};
pub use settings::{AssemblySettings, CollisionSettings};
pub use state::{AssemblySnapshot, AssemblyState, CollisionState, CurrentSelection, SlotState};
pub use store::{asset_path, AssetStore, GltfStore, MemoryStore};
