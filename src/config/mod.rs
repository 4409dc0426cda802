//! # Configuration Management Module
//!
//! Loads and writes `config.toml` for escapekit.
//!
//! ## Configuration Structure
//!
//! - [`GameConfig`] - countdown length, penalties, content file paths
//! - [`StorageConfig`] - where the sled database and result exports live
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use escapekit::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Duration: {}s", config.game.duration_secs);
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! duration_secs = 3600
//! failed_attempt_penalty_secs = 60
//! low_time_warning_secs = 300
//! enforce_required_items = true
//! catalog_path = "data/seeds/catalog.json"
//! achievements_path = "data/seeds/achievements.json"
//! tick_interval_ms = 1000
//!
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "escapekit.log"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::escape::SessionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub game: GameConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub duration_secs: u32,
    pub failed_attempt_penalty_secs: u32,
    /// One-shot warning fires when the clock drops to this many seconds.
    pub low_time_warning_secs: u32,
    #[serde(default = "default_enforce_required_items")]
    pub enforce_required_items: bool,
    /// Catalog JSON. Unset means the built-in starter room.
    #[serde(default)]
    pub catalog_path: Option<String>,
    #[serde(default)]
    pub achievements_path: Option<String>,
    /// Real time per clock second. Shorten for demos.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_enforce_required_items() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Write each finished session as JSON under `<data_dir>/results`.
    #[serde(default)]
    pub export_summaries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl GameConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            duration_secs: self.duration_secs,
            failed_attempt_penalty_secs: self.failed_attempt_penalty_secs,
            low_time_warning_secs: self.low_time_warning_secs,
            enforce_required_items: self.enforce_required_items,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("escapekit.db")
    }

    pub fn results_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("results")
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        let game = &self.game;
        if game.duration_secs == 0 {
            return Err("game.duration_secs must be greater than zero".to_string());
        }
        if game.low_time_warning_secs >= game.duration_secs {
            return Err(format!(
                "game.low_time_warning_secs ({}) must be below game.duration_secs ({})",
                game.low_time_warning_secs, game.duration_secs
            ));
        }
        if game.tick_interval_ms == 0 {
            return Err("game.tick_interval_ms must be greater than zero".to_string());
        }
        if self.storage.data_dir.trim().is_empty() {
            return Err("storage.data_dir must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            game: GameConfig {
                duration_secs: 3600,
                failed_attempt_penalty_secs: 60,
                low_time_warning_secs: 300,
                enforce_required_items: true,
                catalog_path: Some("data/seeds/catalog.json".to_string()),
                achievements_path: Some("data/seeds/achievements.json".to_string()),
                tick_interval_ms: 1000,
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                export_summaries: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("escapekit.log".to_string()),
            },
        }
    }
}
