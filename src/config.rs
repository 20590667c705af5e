use crate::error::Result;
use crate::settings::SweepSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current config file version
pub const CONFIG_VERSION: u32 = 1;

/// Settings file written by `--save-config` and read by `--config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Format version, bumped when the settings layout changes
    pub version: u32,
    pub settings: SweepSettings,
}

impl AppConfig {
    pub fn new(settings: SweepSettings) -> Self {
        Self {
            version: CONFIG_VERSION,
            settings,
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Fields missing from the file's settings fall back to their defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        if config.version > CONFIG_VERSION {
            log::warn!(
                "{} was written by a newer version (format {}), reading it as format {}",
                path.display(),
                config.version,
                CONFIG_VERSION
            );
        }
        Ok(config)
    }
}
