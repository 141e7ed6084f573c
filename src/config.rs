use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogConfig;
use crate::models::{Aggressiveness, CycleDuration, Goal};
use crate::planner::CycleBuilder;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Where cycles are persisted
    pub storage: StorageSettings,

    /// Values pre-filled when building a new cycle
    pub defaults: PlannerDefaults,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,

    /// Directory holding the cycle file or database
    pub data_dir: PathBuf,

    /// Directory for timestamped backups
    pub backup_dir: PathBuf,
}

impl StorageSettings {
    pub fn json_path(&self) -> PathBuf {
        self.data_dir.join(crate::storage::json::DEFAULT_FILE_NAME)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("wavecycle.db")
    }
}

/// Builder defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerDefaults {
    pub goal: Goal,
    pub duration: CycleDuration,
    pub aggressiveness: Aggressiveness,
    pub initial_freshness: f64,
}

impl PlannerDefaults {
    /// Builder seeded with these defaults, starting now
    pub fn builder(&self) -> CycleBuilder {
        CycleBuilder::new()
            .goal(self.goal)
            .duration(self.duration)
            .aggressiveness(self.aggressiveness)
            .initial_freshness(self.initial_freshness)
    }
}

impl Default for PlannerDefaults {
    fn default() -> Self {
        PlannerDefaults {
            goal: Goal::Strength,
            duration: CycleDuration::SIX,
            aggressiveness: Aggressiveness::Moderate,
            initial_freshness: 0.5,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        let base = AppConfig::default_config_dir();
        StorageSettings {
            backend: StorageBackend::Json,
            data_dir: base.join("data"),
            backup_dir: base.join("backups"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();

        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            storage: StorageSettings::default(),
            defaults: PlannerDefaults::default(),
            logging: LogConfig::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .defaults
            .builder()
            .validate()
            .with_context(|| "Invalid planner defaults in configuration")?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wavecycle")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Load configuration from `path` (or the default location), falling
    /// back to defaults when the file is missing
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(&config_path)
    }
}
