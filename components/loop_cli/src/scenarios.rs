//! Built-in conformance scenarios.
//!
//! Each scenario is a top-level program written against the host API. The
//! console output it produces, in order, is the observable contract of the
//! scheduler: synchronous lines first, then microtasks, then timers.

use crate::error::{CliError, CliResult};
use crate::runtime::Runtime;
use async_runtime::Handle;
use core_types::{ErrorKind, JsError, Value};
use std::fmt;

/// A built-in program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Console, values, closures, a deferred value, a timer, a microtask and
    /// an async computation
    Basic,
    /// `fs` write/read/exists/unlink and the `path` operations
    FsPath,
}

impl Scenario {
    /// Every scenario, in the order `all` runs them
    pub const ALL: [Scenario; 2] = [Scenario::Basic, Scenario::FsPath];

    /// Name used on the command line
    pub fn name(self) -> &'static str {
        match self {
            Scenario::Basic => "basic",
            Scenario::FsPath => "fs-path",
        }
    }

    /// One-line description for `--list`
    pub fn description(self) -> &'static str {
        match self {
            Scenario::Basic => "console output, values, deferred values, timers, microtasks, async",
            Scenario::FsPath => "fs and path host modules",
        }
    }

    /// Resolves a `--scenario` argument; `all` selects every scenario.
    pub fn select(name: &str) -> CliResult<Vec<Scenario>> {
        if name == "all" {
            return Ok(Self::ALL.to_vec());
        }
        Self::ALL
            .into_iter()
            .find(|s| s.name() == name)
            .map(|s| vec![s])
            .ok_or_else(|| CliError::UnknownScenario(name.to_string()))
    }

    /// Runs the scenario's top-level program.
    pub fn program(self, handle: &Handle, runtime: &Runtime) -> Result<(), JsError> {
        match self {
            Scenario::Basic => basic(handle, runtime),
            Scenario::FsPath => fs_path(runtime),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn basic(handle: &Handle, runtime: &Runtime) -> Result<(), JsError> {
    let console = runtime.console().clone();
    console.log(&["=== Corten Event Loop Test ===".into()]);
    console.log(&[]);

    console.log(&["Test 1: Basic console.log".into()]);
    console.log(&["Hello, Corten!".into()]);
    console.log(&[]);

    console.log(&["Test 2: Variables and types".into()]);
    let name = "Corten";
    let version = 1.0;
    let active = true;
    console.log(&["Name:".into(), name.into()]);
    console.log(&["Version:".into(), version.into()]);
    console.log(&["Active:".into(), active.into()]);
    console.log(&[]);

    console.log(&["Test 3: Arrays and objects".into()]);
    let arr: Vec<Value> = (1..=5).map(Value::Smi).collect();
    let obj = Value::object([("a", Value::Smi(1)), ("b", Value::Smi(2)), ("c", Value::Smi(3))]);
    console.log(&["Array:".into(), arr.into()]);
    console.log(&["Object:".into(), obj]);
    console.log(&[]);

    console.log(&["Test 4: Functions".into()]);
    fn add(a: i32, b: i32) -> i32 {
        a + b
    }
    let multiply = |a: i32, b: i32| a * b;
    console.log(&["5 + 3 =".into(), add(5, 3).into()]);
    console.log(&["4 * 7 =".into(), multiply(4, 7).into()]);
    console.log(&[]);

    console.log(&["Test 5: Promise".into()]);
    let promise = handle.promise(|resolver| {
        resolver.resolve("Promise resolved!");
        Ok(())
    });
    let c = console.clone();
    promise.then(move |msg| {
        c.log(&["Promise result:".into(), msg]);
        Ok(())
    });
    console.log(&[]);

    console.log(&["Test 6: setTimeout".into()]);
    console.log(&["Setting timeout for 100ms...".into()]);
    let c = console.clone();
    handle.set_timeout(
        move || {
            c.log(&["Timeout executed!".into()]);
            Ok(())
        },
        100,
    );

    console.log(&[]);
    console.log(&["Test 7: Microtask".into()]);
    console.log(&["Before microtask".into()]);
    let c = console.clone();
    handle.queue_microtask(move || {
        c.log(&["Microtask executed!".into()]);
        Ok(())
    });
    console.log(&["After queueing microtask".into()]);

    console.log(&[]);
    console.log(&["Test 8: Async function".into()]);
    let c = console.clone();
    handle.spawn_async(move |scope| async move {
        c.log(&["Async function started".into()]);
        let operand = scope.handle().resolved("Async result!");
        let result = scope.suspend(operand).await?;
        c.log(&["Async function result:".into(), result]);
        Ok(())
    });

    console.log(&[]);
    console.log(&["=== All tests queued ===".into()]);
    Ok(())
}

const FS_TEST_FILE: &str = "hello.txt";
const FS_TEST_CONTENT: &str = "Hello from Corten!";

fn fs_path(runtime: &Runtime) -> Result<(), JsError> {
    let console = runtime.console();
    let modules = runtime.modules();
    console.log(&["=== Testing fs and path modules ===".into()]);
    console.log(&[]);

    console.log(&["Test 1: Writing a file".into()]);
    let fs = modules.require("fs")?.into_fs()?;
    fs.write_file_sync(FS_TEST_FILE, FS_TEST_CONTENT)?;
    console.log(&[format!("✓ File written: {}", FS_TEST_FILE).into()]);
    console.log(&[]);

    console.log(&["Test 2: Reading a file".into()]);
    let content = fs.read_file_sync(FS_TEST_FILE, Some("utf8"))?;
    if content.as_text() != Some(FS_TEST_CONTENT) {
        return Err(JsError::new(
            ErrorKind::Error,
            format!("{} does not hold what was written", FS_TEST_FILE),
        ));
    }
    console.log(&["✓ File content:".into(), content.into_value()]);
    console.log(&[]);

    console.log(&["Test 3: Checking file existence".into()]);
    let exists = fs.exists_sync(FS_TEST_FILE);
    console.log(&["✓ File exists:".into(), exists.into()]);
    console.log(&[]);

    console.log(&["Test 4: Path operations".into()]);
    let path = modules.require("path")?.into_path()?;
    console.log(&["✓ path.join:".into(), path.join(&["foo", "bar", "baz.js"]).into()]);
    console.log(&["✓ path.basename:".into(), path.basename("/foo/bar/baz.js", None).into()]);
    console.log(&["✓ path.dirname:".into(), path.dirname("/foo/bar/baz.js").into()]);
    console.log(&["✓ path.extname:".into(), path.extname("test.js").into()]);
    console.log(&[]);

    console.log(&["Test 5: Deleting the file".into()]);
    fs.unlink_sync(FS_TEST_FILE)?;
    if fs.exists_sync(FS_TEST_FILE) {
        return Err(JsError::new(
            ErrorKind::Error,
            format!("{} still exists after unlink", FS_TEST_FILE),
        ));
    }
    console.log(&["✓ File deleted".into()]);
    console.log(&[]);

    console.log(&["=== All fs/path tests passed! ===".into()]);
    Ok(())
}
