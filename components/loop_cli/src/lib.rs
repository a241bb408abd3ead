//! Event loop runtime CLI library
//!
//! Provides the [`Runtime`] that wires the event loop to the host modules,
//! the configuration file format, and the built-in conformance scenarios
//! run by the `corten-loop` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod error;
pub mod runtime;
pub mod scenarios;

pub use cli::Cli;
pub use config::{CliConfig, HostConfig};
pub use error::{CliError, CliResult};
pub use runtime::Runtime;
pub use scenarios::Scenario;
