//! Script error types and error handling.
//!
//! This module provides error types that correspond to the built-in error
//! constructors of the scripting language, along with stack trace information.
//! A rejection reason in the runtime is always a [`JsError`].

use crate::{SourcePosition, StackFrame, Value};
use std::fmt;
use thiserror::Error;

/// The kind of script error.
///
/// These correspond to the built-in error constructors, plus [`ErrorKind::Error`]
/// for arbitrary thrown values and [`ErrorKind::InternalError`] for failures
/// raised by the runtime itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Generic `Error`, also used for thrown non-error values
    Error,
    /// Syntax error in script code
    SyntaxError,
    /// Type error (e.g., calling a non-function)
    TypeError,
    /// Reference to an undefined variable
    ReferenceError,
    /// Value out of allowed range
    RangeError,
    /// Error in eval() function
    EvalError,
    /// Error in URI handling functions
    URIError,
    /// Internal engine error
    InternalError,
}

impl ErrorKind {
    /// Returns the constructor name used when the error is printed.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::URIError => "URIError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A script error with message and stack trace.
///
/// This struct represents an exception that can be thrown, caught, or used as
/// the rejection reason of a deferred value.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError};
///
/// let error = JsError {
///     kind: ErrorKind::TypeError,
///     message: "undefined is not a function".to_string(),
///     stack: vec![],
///     source_position: None,
/// };
///
/// assert_eq!(error.message, "undefined is not a function");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Stack trace (call stack at the time of the error)
    pub stack: Vec<StackFrame>,
    /// Source position where the error occurred
    pub source_position: Option<SourcePosition>,
}

impl JsError {
    /// Creates an error of the given kind with an empty stack.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
            source_position: None,
        }
    }

    /// Creates a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates an `InternalError` raised by the runtime.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Wraps an arbitrary thrown value, e.g. `reject("boom")` or `throw 42`.
    ///
    /// ```
    /// use core_types::{ErrorKind, JsError, Value};
    ///
    /// let err = JsError::thrown(Value::from("boom"));
    /// assert_eq!(err.kind, ErrorKind::Error);
    /// assert_eq!(err.message, "boom");
    /// ```
    pub fn thrown(value: Value) -> Self {
        Self::new(ErrorKind::Error, value.to_js_string())
    }

    /// Appends a frame to the stack trace.
    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.stack.push(frame);
        self
    }
}
