use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub pistons: PistonsSection,
    #[serde(default)]
    pub blocks: BlocksSection,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionSection {
    /// Milliseconds per simulation tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Capacity of the per-session ordered event queue.
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
}

fn default_tick_interval_ms() -> u64 {
    50
}

fn default_event_queue_capacity() -> usize {
    256
}

impl SessionSection {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            event_queue_capacity: default_event_queue_capacity(),
        }
    }
}

/// Where piston moves are learned from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Block events from the server; attached blocks found by search.
    #[default]
    Vanilla,
    /// A server plugin reports moves with their attached blocks. Only empty
    /// sticky retractions come through block events.
    Plugin,
}

#[derive(Debug, Default, Deserialize)]
pub struct PistonsSection {
    #[serde(default)]
    pub event_source: EventSource,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlocksSection {
    /// JSON block table. Empty uses the built-in vanilla subset.
    #[serde(default)]
    pub data_path: String,
}

impl BridgeConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Like [`BridgeConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }
}
