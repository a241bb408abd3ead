//! End-to-End CLI Integration Tests
//!
//! Runs the built-in scenarios through the loop_cli Runtime API, the same
//! path the `corten-loop` binary takes.

use async_runtime::{CollectingSink, TimeSource};
use clap::Parser as _;
use host_modules::Console;
use loop_cli::{Cli, CliConfig, Runtime, Scenario};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

fn runtime_for(cli: &Cli) -> (Runtime, Rc<RefCell<Vec<String>>>) {
    let output = Rc::new(RefCell::new(Vec::new()));
    let config = CliConfig::from_cli(cli).expect("config");
    let runtime = Runtime::new(config)
        .with_console(Console::new_with_output(output.clone()))
        .with_sink(Rc::new(CollectingSink::new()));
    (runtime, output)
}

/// Test: config file plus flag overrides feed the runtime
#[test]
fn test_e2e_config_file_and_flags() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("loop.toml");
    fs::write(
        &config_path,
        format!("[host]\nbase_dir = {:?}\n", dir.path().display().to_string()),
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "corten-loop",
        "--config",
        config_path.to_str().unwrap(),
        "--virtual-time",
        "--scenario",
        "fs-path",
    ])
    .unwrap();
    let (runtime, output) = runtime_for(&cli);

    assert_eq!(runtime.config().event_loop.time_source, TimeSource::Virtual);
    assert_eq!(runtime.config().host.base_dir, dir.path());

    for scenario in Scenario::select(&cli.scenario).unwrap() {
        runtime.run_scenario(scenario).unwrap();
    }
    assert!(output
        .borrow()
        .iter()
        .any(|line| line == "=== All fs/path tests passed! ==="));
}

/// Test: the basic scenario's report serializes the way `--json` prints it
#[test]
fn test_e2e_basic_report_json() {
    let cli = Cli::try_parse_from(["corten-loop", "--virtual-time", "-s", "basic"]).unwrap();
    let (runtime, output) = runtime_for(&cli);

    let report = runtime.run_scenario(Scenario::Basic).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["timers_fired"], 1);
    assert_eq!(json["macrotasks_run"], 1);
    assert_eq!(json["microtasks_run"], 3);
    assert_eq!(json["uncaught_errors"], 0);
    assert_eq!(json["elapsed_ms"], 100);
    assert_eq!(
        output.borrow().last().map(String::as_str),
        Some("Timeout executed!")
    );
}

/// Test: an unknown scenario name is rejected before anything runs
#[test]
fn test_e2e_unknown_scenario() {
    let cli = Cli::try_parse_from(["corten-loop", "--scenario", "repl"]).unwrap();
    let err = Scenario::select(&cli.scenario).unwrap_err();
    assert_eq!(err.to_string(), "unknown scenario 'repl' (try --list)");
}
