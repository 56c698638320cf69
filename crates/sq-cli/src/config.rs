//! Configuration loading and management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use sq_core::Labels;
use sq_engine::EngineConfig;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Depth of the engine's command queue.
    pub command_queue_capacity: usize,
    /// How often `watch` re-reads the database, in milliseconds.
    pub watch_interval_ms: u64,
    /// Text used when rendering history.
    #[serde(default)]
    pub labels: Labels,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let engine = EngineConfig::default();
        Self {
            database_path: data_dir.join("sq.db"),
            command_queue_capacity: engine.queue_capacity,
            watch_interval_ms: 1000,
            labels: engine.labels,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (SQ_*)
        figment = figment.merge(Env::prefixed("SQ_"));

        figment.extract()
    }

    /// Engine settings derived from this configuration.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            queue_capacity: self.command_queue_capacity,
            labels: self.labels.clone(),
        }
    }

    pub const fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

/// Returns the platform-specific config directory for sq.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sq"))
}

/// Returns the platform-specific data directory for sq.
///
/// On Linux: `~/.local/share/sq`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("sq"))
}
