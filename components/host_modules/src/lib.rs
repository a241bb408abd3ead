//! Host-provided modules for scripts.
//!
//! These are thin synchronous shims: every call completes before it returns
//! and none of them interact with the event loop.
//!
//! - [`Console`] - `console.log` and friends over a [`ConsoleWriter`]
//! - [`FileSystem`] - the `fs` module's `*Sync` calls
//! - [`PathModule`] - the `path` module's lexical path utilities
//! - [`ModuleRegistry`] - `require` for the built-in modules

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod console;
pub mod error;
pub mod fs;
pub mod path;
pub mod require;

pub use console::{CaptureWriter, Console, ConsoleWriter, StdoutWriter};
pub use error::HostError;
pub use fs::{FileContents, FileStat, FileSystem};
pub use path::{ParsedPath, PathModule, DELIMITER, SEP};
pub use require::{HostModule, ModuleRegistry};
