//! Error types for the CLI

use async_runtime::LoopError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// The config file is not valid TOML for [`CliConfig`](crate::CliConfig)
    #[error("invalid config file {}: {source}", path.display())]
    Config {
        /// Path of the config file
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },

    /// File I/O error
    #[error("could not read {}: {source}", path.display())]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The scenario program failed or the loop refused to run it
    #[error("scenario '{scenario}' failed: {source}")]
    Loop {
        /// Scenario name
        scenario: String,
        /// Loop error
        #[source]
        source: LoopError,
    },

    /// Scheduled tasks of the scenario raised errors
    #[error("scenario '{scenario}' raised {count} uncaught error(s)")]
    Uncaught {
        /// Scenario name
        scenario: String,
        /// Number of uncaught errors
        count: usize,
    },

    /// `--scenario` named nothing we know
    #[error("unknown scenario '{0}' (try --list)")]
    UnknownScenario(String),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
