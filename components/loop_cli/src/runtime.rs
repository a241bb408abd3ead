//! Runtime orchestration
//!
//! The Runtime ties the components together:
//! - a fresh [`EventLoop`] per program, configured from [`CliConfig`]
//! - the shared [`Console`]
//! - the `require` registry serving `fs` and `path`

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::scenarios::Scenario;
use async_runtime::{DiagnosticSink, EventLoop, Handle, RunReport, TracingSink};
use core_types::JsError;
use host_modules::{Console, ModuleRegistry};
use std::rc::Rc;

/// Host environment for running programs on the event loop
pub struct Runtime {
    config: CliConfig,
    console: Rc<Console>,
    modules: Rc<ModuleRegistry>,
    sink: Rc<dyn DiagnosticSink>,
}

impl Runtime {
    /// Create a runtime writing to stdout and logging diagnostics
    ///
    /// # Example
    /// ```
    /// use loop_cli::{CliConfig, Runtime};
    ///
    /// let runtime = Runtime::new(CliConfig::default());
    /// assert!(runtime.modules().require("path").is_ok());
    /// ```
    pub fn new(config: CliConfig) -> Self {
        let modules = Rc::new(ModuleRegistry::new(config.host.base_dir.clone()));
        Self {
            config,
            console: Rc::new(Console::new()),
            modules,
            sink: Rc::new(TracingSink),
        }
    }

    /// Replace the console, e.g. with a capturing one
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = Rc::new(console);
        self
    }

    /// Replace the diagnostic sink
    pub fn with_sink(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The effective configuration
    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    /// The console programs print to
    pub fn console(&self) -> &Rc<Console> {
        &self.console
    }

    /// The module registry behind `require`
    pub fn modules(&self) -> &Rc<ModuleRegistry> {
        &self.modules
    }

    /// Run `program` as the top-level unit of a new event loop and drive the
    /// loop to completion.
    ///
    /// # Errors
    /// `CliError::Loop` when the program itself fails, `CliError::Uncaught`
    /// when any scheduled task failed.
    pub fn run<F>(&self, name: &str, program: F) -> CliResult<RunReport>
    where
        F: FnOnce(&Handle) -> Result<(), JsError>,
    {
        let mut event_loop = EventLoop::with_sink(self.config.event_loop.clone(), self.sink.clone());
        let report = event_loop.run(program).map_err(|source| CliError::Loop {
            scenario: name.to_string(),
            source,
        })?;
        tracing::debug!(
            scenario = name,
            macrotasks = report.macrotasks_run,
            microtasks = report.microtasks_run,
            elapsed_ms = report.elapsed_ms,
            "scenario finished"
        );
        if report.uncaught_errors > 0 {
            return Err(CliError::Uncaught {
                scenario: name.to_string(),
                count: report.uncaught_errors,
            });
        }
        Ok(report)
    }

    /// Run one built-in scenario
    pub fn run_scenario(&self, scenario: Scenario) -> CliResult<RunReport> {
        self.run(scenario.name(), |handle| scenario.program(handle, self))
    }
}
