//! Corten event loop runtime CLI
//!
//! Entry point for the runtime. Parses CLI arguments, loads the config and
//! delegates to the Runtime for execution.

use clap::Parser as ClapParser;
use loop_cli::{Cli, CliConfig, CliResult, Runtime, Scenario};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn run(cli: &Cli) -> CliResult<()> {
    if cli.list {
        for scenario in Scenario::ALL {
            println!("{:<10} {}", scenario.name(), scenario.description());
        }
        return Ok(());
    }

    let scenarios = Scenario::select(&cli.scenario)?;
    let config = CliConfig::from_cli(cli)?;
    tracing::debug!(?config, "configuration loaded");
    let runtime = Runtime::new(config);

    for scenario in scenarios {
        let report = runtime.run_scenario(scenario)?;
        if cli.json {
            match serde_json::to_string(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!(%scenario, "could not serialize run report: {}", e),
            }
        }
    }
    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
