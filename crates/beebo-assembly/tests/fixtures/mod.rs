use beebo_assembly::{AssemblySettings, AssetStore, LoadError, MemoryStore, ProgressSink};
use beebo_core::{Catalog, Mesh, SceneNode};
use glam::Vec3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Small catalog whose accessory boxes only overlap for Cloak + Beanie
pub const CATALOG: &str = r#"
[[body]]
id = "body_white"
asset = "body_white.glb"
display_name = "White"
price = 5.0

[[face]]
id = "face_round"
asset = "face_round.glb"
display_name = "Round"
price = 3.0

[[screen]]
id = "screen_basic"
asset = "screen_basic.glb"
display_name = "Basic"
price = 2.0

[[specs]]
id = "specs_none"
asset = "specs_none.glb"
display_name = "Plain"
price = 0.0

[[accessories.clothes]]
id = "none"
display_name = "None"

[[accessories.clothes]]
id = "accessories_clothes_coat"
asset = "coat.glb"
display_name = "Coat"
price = 4.0

[[accessories.clothes]]
id = "accessories_clothes_cloak"
asset = "cloak.glb"
display_name = "Cloak"
price = 6.0

[[accessories.face]]
id = "none"
display_name = "None"

[[accessories.face]]
id = "accessories_face_beard"
asset = "beard.glb"
display_name = "Beard"
price = 2.0

[[accessories.head]]
id = "none"
display_name = "None"

[[accessories.head]]
id = "accessories_head_beanie"
asset = "beanie.glb"
display_name = "Beanie"
price = 3.0

[[accessories.head]]
id = "accessories_head_afro"
asset = "afro.glb"
display_name = "Afro"
price = 2.0
"#;

fn cuboid(min: [f32; 3], max: [f32; 3]) -> SceneNode {
    SceneNode::from_mesh(Mesh::cuboid(Vec3::from(min), Vec3::from(max)))
}

pub fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_toml(CATALOG).unwrap())
}

/// Model-space boxes; at 0.1 scale the Cloak's top (0.51) reaches 0.01
/// into the Beanie, whose underside is at 0.50
pub fn store() -> MemoryStore {
    MemoryStore::new()
        .with_asset("body_white.glb", cuboid([-4.0, -6.0, -2.0], [4.0, 4.0, 2.0]))
        .with_asset("face_round.glb", cuboid([-3.0, 0.0, 2.0], [3.0, 4.0, 2.5]))
        .with_asset("screen_basic.glb", cuboid([-2.5, 0.5, 2.5], [2.5, 3.5, 2.6]))
        .with_asset("specs_none.glb", cuboid([-3.0, 2.0, 2.6], [3.0, 3.0, 3.0]))
        .with_asset("coat.glb", cuboid([-5.0, -5.0, -3.0], [5.0, 0.0, 3.0]))
        .with_asset("cloak.glb", cuboid([-2.0, -5.0, -1.0], [2.0, 5.1, 1.0]))
        .with_asset("beard.glb", cuboid([-2.0, 2.0, 3.5], [2.0, 4.0, 4.5]))
        .with_asset("beanie.glb", cuboid([-3.0, 5.0, -3.0], [3.0, 8.0, 3.0]))
        .with_asset("afro.glb", cuboid([-3.0, 9.0, -3.0], [3.0, 12.0, 3.0]))
}

pub fn settings() -> AssemblySettings {
    AssemblySettings::default()
}

/// Holds fetches of one asset until the gate is opened
pub struct GatedStore {
    inner: MemoryStore,
    gated: String,
    armed: AtomicBool,
    pub gate: Arc<Notify>,
}

impl GatedStore {
    pub fn new(inner: MemoryStore, filename: &str) -> Self {
        Self {
            inner,
            gated: beebo_assembly::asset_path(filename),
            armed: AtomicBool::new(true),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Let fetches of the gated asset through until [`GatedStore::arm`]
    pub fn disarmed(self) -> Self {
        self.armed.store(false, Ordering::SeqCst);
        self
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl AssetStore for GatedStore {
    async fn fetch(&self, path: &str, progress: &dyn ProgressSink) -> Result<SceneNode, LoadError> {
        if path == self.gated && self.armed.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        self.inner.fetch(path, progress).await
    }
}
