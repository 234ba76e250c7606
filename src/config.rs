use crate::particle::DeviceClass;
use crate::settings::{RenderSettings, SynthSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u32 = 1;

/// Persisted application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    pub synth: SynthSettings,
    pub render: RenderSettings,
    /// Spawn profile used on reset
    pub device: DeviceClass,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            synth: SynthSettings::default(),
            render: RenderSettings::default(),
            device: DeviceClass::default(),
        }
    }
}

impl AppConfig {
    /// Default config location, `<config dir>/particle-chimes/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("particle-chimes").join("config.json"))
    }

    /// Write config as pretty JSON, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create config directory: {}", e))?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let content =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;
        let mut config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;
        if config.version > CONFIG_VERSION {
            return Err(format!(
                "Config version {} is newer than supported version {}",
                config.version, CONFIG_VERSION
            ));
        }
        config.clamp_to_ranges();
        Ok(config)
    }

    /// Clamp hand-edited or overridden values to their adjustable ranges
    pub fn clamp_to_ranges(&mut self) {
        self.synth.clamp_to_ranges();
        self.render.clamp_to_ranges();
    }

    /// Load from `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, String> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}
