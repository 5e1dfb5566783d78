//! User configuration
//!
//! Read from `config.toml` under the `finmetrics` config directory. Every key
//! is optional; command line flags take precedence over the file.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::FinmetricsError;

const CONFIG_FILENAME: &str = "config.toml";

/// Time-series store receiving the metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Write an OpenMetrics file for `promtool tsdb create-blocks-from`
    #[default]
    Prometheus,
    /// Push straight to VictoriaMetrics
    Victoria,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ledger_file: Option<PathBuf>,
    pub hledger_bin: String,
    pub metrics_url: Option<String>,
    pub sink: SinkKind,
    pub bucket_days: i64,
    pub batch_size: usize,
    pub batch_pause_secs: u64,
    pub exposition_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_file: None,
            hledger_bin: "hledger".to_string(),
            metrics_url: None,
            sink: SinkKind::default(),
            bucket_days: 30,
            batch_size: 5000,
            batch_pause_secs: 10,
            exposition_file: PathBuf::from("om.txt"),
        }
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dir_spec::config_home)
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("finmetrics"))
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, FinmetricsError> {
        toml::from_str(text).map_err(|e| FinmetricsError::Config(e.to_string()))
    }

    /// Load `path`, or the default config file when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (get_config_dir()?.join(CONFIG_FILENAME), false),
        };

        if !explicit && !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Ledger to read: the flag, then the config file, then `$LEDGER_FILE`.
    ///
    /// `None` leaves the choice to hledger.
    pub fn ledger_path(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf)
            .or_else(|| self.ledger_file.clone())
            .or_else(|| std::env::var_os("LEDGER_FILE").map(PathBuf::from))
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_secs(self.batch_pause_secs)
    }
}
