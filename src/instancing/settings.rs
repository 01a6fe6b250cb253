// src/instancing/settings.rs
//! Data-driven instancing settings + loader.

use bevy::asset::{io::Reader, AssetLoader, LoadContext};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::core::{CapturePolicy, DEFAULT_MAX_INSTANCES_PER_BATCH};

// ---------- Public plugin to register asset+loader ----------

pub struct InstancingSettingsAssetPlugin;

impl Plugin for InstancingSettingsAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<InstancingSettings>()
            .register_asset_loader(InstancingSettingsLoader);
    }
}

// ---------- Settings (data form) ----------

#[derive(Asset, TypePath, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstancingSettings {
    /// Batch ceiling for every group; clamped to the hardware limit at draw time.
    #[serde(default = "default_max_instances_per_batch")]
    pub max_instances_per_batch: usize,

    /// Which children of the instance root become live nodes.
    #[serde(default)]
    pub capture: CapturePolicy,
}

fn default_max_instances_per_batch() -> usize {
    DEFAULT_MAX_INSTANCES_PER_BATCH
}

impl Default for InstancingSettings {
    fn default() -> Self {
        Self {
            max_instances_per_batch: default_max_instances_per_batch(),
            capture: CapturePolicy::default(),
        }
    }
}

impl InstancingSettings {
    pub fn from_ron_bytes(bytes: &[u8]) -> Result<Self, InstancingSettingsLoadError> {
        ron::de::from_bytes(bytes).map_err(|e| InstancingSettingsLoadError::Ron(e.to_string()))
    }
}

// ---------- Asset loader for `.instancing.ron` ----------

#[derive(Default)]
pub struct InstancingSettingsLoader;

impl AssetLoader for InstancingSettingsLoader {
    type Asset = InstancingSettings;
    type Settings = ();
    type Error = InstancingSettingsLoadError;

    fn extensions(&self) -> &[&str] {
        &["instancing.ron"]
    }

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        InstancingSettings::from_ron_bytes(&bytes)
    }
}

// ---------- Loader errors ----------

#[derive(thiserror::Error, Debug)]
pub enum InstancingSettingsLoadError {
    #[error("I/O while reading instancing settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
}
