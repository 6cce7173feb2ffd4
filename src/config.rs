// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::overlay::OverlayConfig;
use crate::scene::ForegroundCamera;
use crate::simulation::SimulationConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub overlay: OverlayConfig,
    pub simulation: SimulationConfig,
    pub camera: ForegroundCamera,
    /// Number of frames to run before exiting.
    pub frames: u32,
    pub export: bool,
    pub output_directory: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            overlay: OverlayConfig::default(),
            simulation: SimulationConfig::default(),
            camera: ForegroundCamera::default(),
            frames: 300,
            export: true,
            output_directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("MagicMirror")))
                .unwrap_or_else(|| PathBuf::from("./output")),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}
