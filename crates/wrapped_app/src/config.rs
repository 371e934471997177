//! RON configuration for the terminal app.
//!
//! A missing file means defaults: an in-memory store with the demo
//! processor, three second polling and info logs written to `./wrapped.log`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use wrapped_engine::{EngineSettings, RestSettings};

use crate::logging::{LogDestination, DEFAULT_LOG_FILE};
use crate::simulator::SimulatorSettings;

pub const DEFAULT_CONFIG_PATH: &str = "wrapped.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreConfig {
    /// Process-local table; `simulate` runs the demo processor against it.
    Memory { unique_active: bool, simulate: bool },
    /// PostgREST-style job table.
    Rest(RestSettings),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            unique_active: false,
            simulate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub poll_interval_ms: u64,
    pub log: LogDestination,
    /// `trace`, `debug`, `info`, `warn`, `error` or `off`.
    pub log_level: String,
    pub log_file: PathBuf,
    /// Wallet connected on startup when none is given on the command line.
    pub wallet: Option<String>,
    pub simulator: SimulatorSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            poll_interval_ms: 3_000,
            log: LogDestination::default(),
            log_level: "info".to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            wallet: None,
            simulator: SimulatorSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }
}

pub fn parse(text: &str) -> anyhow::Result<AppConfig> {
    ron::from_str(text).context("invalid config")
}

pub fn load(path: &Path) -> anyhow::Result<AppConfig> {
    match fs::read_to_string(path) {
        Ok(text) => parse(&text),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(err) => Err(err).context("could not read config"),
    }
}

pub fn write_default(path: &Path) -> anyhow::Result<()> {
    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(&AppConfig::default(), pretty)
        .context("could not serialize default config")?;
    fs::write(path, content).with_context(|| format!("could not write {}", path.display()))
}
