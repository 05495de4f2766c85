//! Configuration loading

use anyhow::{Context, Result};
use beebo_assembly::AssemblySettings;
use beebo_core::Catalog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub assembly: AssemblySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory containing `models/`
    #[serde(default = "default_assets_root")]
    pub root: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: default_assets_root(),
        }
    }
}

fn default_assets_root() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Custom catalog TOML; the built-in catalog is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CatalogConfig {
    pub fn load(&self) -> Result<Catalog> {
        match &self.path {
            Some(path) => Catalog::from_file(path)
                .with_context(|| format!("Failed to load catalog {}", path.display())),
            None => Catalog::builtin().context("Built-in catalog is invalid"),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        assets: AssetsConfig {
            root: PathBuf::from("public"),
        },
        ..Default::default()
    };

    let content = format!(
        "# Beebo assembler configuration\n\
         # [assets] root must contain a models/ directory with the GLB files.\n\
         # Leave [catalog] path unset to use the built-in part catalog.\n\n{}",
        toml::to_string_pretty(&config)?
    );
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
