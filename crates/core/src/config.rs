//! Application configuration.
//!
//! Settings are layered: built-in defaults, then `config.json` in the user's
//! config directory, then `DTOP_*` environment variables with `__` between
//! nested keys (e.g. `DTOP_PUBLISH__USERNAME=alice`).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::console::{ConsoleSettings, PublishSettings};

const APP_DIR: &str = "dtop";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_TICK_RATE_MS: u64 = 250;

/// Which container runtime adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// The local Docker Engine via bollard.
    #[default]
    Docker,
    /// Seeded in-memory data; no runtime needed.
    Demo,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rows per page in every list. Must be positive.
    pub page_size: usize,
    /// Runtime adapter.
    pub backend: BackendChoice,
    /// Explicit Docker socket path; bollard's local defaults when unset.
    pub docker_socket: Option<String>,
    /// Publish wizard defaults.
    pub publish: PublishSettings,
    /// Directory for `dtop.log`; `./logs` when unset.
    pub log_dir: Option<PathBuf>,
    /// Input poll interval in milliseconds.
    pub tick_rate_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            backend: BackendChoice::Docker,
            docker_socket: None,
            publish: PublishSettings::default(),
            log_dir: None,
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
        }
    }
}

impl AppConfig {
    /// Load from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path()?)
    }

    /// Load from `path` (which need not exist) plus environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = PublishSettings::default();
        let settings = Config::builder()
            .set_default("page_size", DEFAULT_PAGE_SIZE as i64)?
            .set_default("backend", "docker")?
            .set_default("publish.registry", defaults.registry)?
            .set_default("publish.username", defaults.username)?
            .set_default("publish.tag", defaults.tag)?
            .set_default("tick_rate_ms", DEFAULT_TICK_RATE_MS as i64)?
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix("DTOP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be greater than zero");
        }
        if self.tick_rate_ms == 0 {
            bail!("tick_rate_ms must be greater than zero");
        }
        Ok(())
    }

    /// Settings handed to the console.
    pub fn console_settings(&self) -> ConsoleSettings {
        ConsoleSettings {
            page_size: self.page_size,
            publish: self.publish.clone(),
        }
    }

    /// Resolved log directory.
    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?.join("logs")),
        }
    }
}

fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not determine the user config directory")?;
    Ok(base.join(APP_DIR))
}

/// `<config dir>/dtop/config.json`.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Write a default configuration file if none exists yet, returning its path.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = default_config_path()?;
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let contents = serde_json::to_string_pretty(&AppConfig::default())?;
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(())
}
