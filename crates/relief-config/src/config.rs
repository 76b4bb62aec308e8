//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";
const APP_NAME: &str = "relief";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Offline tile ingestion settings.
    pub ingest: IngestConfig,
    /// Runtime world-streaming settings.
    pub world: WorldConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Tile ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Root directory holding `manifest.json` and `<area>/z<zoom>/<tx>_<tz>.png`.
    pub tiles_dir: PathBuf,
    /// Directory receiving merged grids and `analysis.json`.
    pub output_dir: PathBuf,
    /// Restrict ingestion to a single area id. `None` ingests every area.
    pub area: Option<String>,
    /// Merge every zoom level with a square tile grid instead of only the finest.
    pub merge_all_zooms: bool,
}

/// World-streaming configuration consumed by the chunk height workers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk edge length in world units (meters).
    pub chunk_size: f32,
    /// Grid segments per chunk edge; a chunk grid holds `(segments + 1)^2` heights.
    pub segments: u32,
    /// Seed for the procedural height source.
    pub seed: i64,
    /// Number of height generation worker threads (0 = derive from CPU count).
    pub worker_threads: usize,
    /// Maximum height generation tasks queued at once.
    pub max_in_flight: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for JSON log files written in debug builds.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tiles_dir: PathBuf::from("tiles"),
            output_dir: PathBuf::from("output"),
            area: None,
            merge_all_zooms: false,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256.0,
            segments: 64,
            seed: 0,
            worker_threads: 0,
            max_in_flight: 64,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Platform configuration directory for the pipeline (`<os config dir>/relief`).
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] if the OS does not expose one.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Load / Save / Reload ---

impl Config {
    fn read_file(config_path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(config_path).map_err(ConfigError::io(config_path))?;
        ron::from_str(&contents).map_err(ConfigError::parse(config_path))
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read_file(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::io(config_dir))?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::io(&config_path))?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let new_config = Self::read_file(&config_path)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Path of `manifest.json` inside the configured tiles directory.
    pub fn manifest_path(&self) -> PathBuf {
        self.ingest.tiles_dir.join("manifest.json")
    }
}
