//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// Corten event loop runtime
#[derive(Debug, Parser)]
#[command(name = "corten-loop", version, about = "Runs the event loop conformance scenarios")]
pub struct Cli {
    /// Scenario to run: basic, fs-path or all
    #[arg(short, long, default_value = "all")]
    pub scenario: String,

    /// List the available scenarios and exit
    #[arg(short, long)]
    pub list: bool,

    /// TOML config file with [event_loop] and [host] tables
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run on virtual time: timers fire without real sleeps
    #[arg(long)]
    pub virtual_time: bool,

    /// Directory the fs module resolves relative paths against
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Print each run report as JSON
    #[arg(long)]
    pub json: bool,
}
