use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::daemon::TickConfig;
use crate::domain::BlockId;
use crate::evaluator::LayerOrder;
use crate::host::FlatWorld;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub tick: TickSettings,
    pub storage: StorageConfig,
    pub evaluation: EvaluationConfig,
    pub reverse: ReverseConfig,
    pub viewer: ViewerConfig,
    pub world: WorldConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickSettings {
    pub ticks_per_second: u32,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self { ticks_per_second: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub autosave_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("Animations"),
            autosave_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub layer_order: LayerOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseConfig {
    pub max_super_period: u64,
}

impl Default for ReverseConfig {
    fn default() -> Self {
        Self {
            max_super_period: u64::from(u16::MAX),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub marker_block: BlockId,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self { marker_block: 21 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: u16,
    pub height: u16,
    pub length: u16,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 128,
            length: 256,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            tick: TickSettings::default(),
            storage: StorageConfig::default(),
            evaluation: EvaluationConfig::default(),
            reverse: ReverseConfig::default(),
            viewer: ViewerConfig::default(),
            world: WorldConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        if config.tick.ticks_per_second == 0 {
            eyre::bail!("tick.ticks_per_second must be at least 1");
        }

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Tick loop settings derived from this config
    pub fn tick_config(&self) -> TickConfig {
        TickConfig::from_rate(self.tick.ticks_per_second).with_layer_order(self.evaluation.layer_order)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.storage.autosave_secs.max(1))
    }

    /// Flat world sized from the `world` section
    pub fn flat_world(&self) -> FlatWorld {
        FlatWorld::new(self.world.width, self.world.height, self.world.length)
    }
}
