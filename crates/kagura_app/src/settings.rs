use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use kagura_animation::LoopMode;
use kagura_assets::ModelRequest;
use kagura_core::AssetError;
use kagura_scene::{CameraSettings, SkyParameters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopSetting {
    #[default]
    Once,
    Loop,
    PingPong,
}

impl From<LoopSetting> for LoopMode {
    fn from(value: LoopSetting) -> Self {
        match value {
            LoopSetting::Once => LoopMode::Once,
            LoopSetting::Loop => LoopMode::Loop,
            LoopSetting::PingPong => LoopMode::PingPong,
        }
    }
}

fn default_true() -> bool {
    true
}

/// One model to load at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub model: String,
    #[serde(default)]
    pub motions: Vec<String>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_true")]
    pub physics: bool,
    #[serde(default)]
    pub loop_mode: LoopSetting,
}

impl ModelEntry {
    #[must_use]
    pub fn request(&self) -> ModelRequest {
        ModelRequest {
            model: self.model.clone(),
            motions: self.motions.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Startup configuration of a [`Stage`](crate::Stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    pub models: Vec<ModelEntry>,
    /// Seconds to hold the last pose after a clip ends
    pub afterglow: f32,
    pub reset_physics_on_loop: bool,
    pub outline: bool,
    pub camera: CameraSettings,
    pub sky: SkyParameters,
    pub viewport: Viewport,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            afterglow: 0.0,
            reset_physics_on_loop: false,
            outline: true,
            camera: CameraSettings::default(),
            sky: SkyParameters::default(),
            viewport: Viewport::default(),
        }
    }
}

impl StageSettings {
    pub fn from_json(bytes: &[u8]) -> Result<Self, AssetError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reads settings from a JSON file. Relative model paths stay relative
    /// to the working directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(path.display().to_string()),
            _ => AssetError::Io(err),
        })?;
        Self::from_json(&bytes)
    }
}
