//! Core value and error types shared by the Corten event-loop runtime.
//!
//! This crate provides the foundational vocabulary for the runtime:
//! script values, errors with stack traces, and source location tracking.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of script values
//! - [`JsError`] - Script errors with stack traces
//! - [`ErrorKind`] - Types of script errors
//! - [`SourcePosition`] - Source code location
//! - [`StackFrame`] - Call stack frame information
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::Smi(42);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let error = JsError::new(ErrorKind::TypeError, "undefined is not a function");
//! assert_eq!(error.to_string(), "TypeError: undefined is not a function");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod source;
mod value;

pub use error::{ErrorKind, JsError};
pub use source::{SourcePosition, StackFrame};
pub use value::Value;
