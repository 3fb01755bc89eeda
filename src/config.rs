use anyhow::{Context, Result};
use hoh_data::DEFAULT_TEMPLATE_BORDER;
use hoh_vision::{ValueCrop, VisionConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Settings for a scan run. Every field is optional in the JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub vision: VisionConfig,
    pub value_crop: ValueCrop,
    /// Black border added around each reference icon
    pub template_border: u32,
    /// Holds one directory per scan (`<data_root>/<dir>/hoh/...`)
    pub data_root: PathBuf,
    /// Holds one directory per troop label
    pub templates_dir: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            vision: VisionConfig::default(),
            value_crop: ValueCrop::default(),
            template_border: DEFAULT_TEMPLATE_BORDER,
            data_root: PathBuf::from("data"),
            templates_dir: PathBuf::from("templates").join("hoh"),
        }
    }
}

impl ScanConfig {
    /// Load from a JSON file. A missing file means defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            info!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
