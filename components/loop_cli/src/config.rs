//! Config file loading
//!
//! ```toml
//! [event_loop]
//! time_source = "virtual"
//! shutdown_after_ms = 5000
//! report_unhandled_rejections = true
//!
//! [host]
//! base_dir = "/tmp/corten"
//! ```
//!
//! Every table and field is optional. Command-line flags override the file.

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use async_runtime::{LoopConfig, TimeSource};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Whole config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Settings handed to each event loop
    pub event_loop: LoopConfig,
    /// Settings for the host modules
    pub host: HostConfig,
}

/// The `[host]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Base directory for relative `fs` paths and the `path` working directory
    pub base_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
        }
    }
}

impl CliConfig {
    /// Reads and parses a config file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(CliError::Io {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        Self::parse(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            CliError::Config {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Parses config text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Builds the effective config: the `--config` file if given, then
    /// command-line overrides.
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(cli);
        Ok(config)
    }

    /// Applies command-line flags on top of the file settings.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if cli.virtual_time {
            self.event_loop.time_source = TimeSource::Virtual;
        }
        if let Some(dir) = &cli.base_dir {
            self.host.base_dir = dir.clone();
        }
    }
}
