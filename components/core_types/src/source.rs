//! Source position and stack frame types.
//!
//! Errors raised from scheduled callbacks carry the frames the host knows
//! about (the callback kind and the scheduling site), which is all the loop
//! can offer without the evaluator.

use std::fmt;

/// A position in script source code.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition { line: 10, column: 5, offset: 150 };
/// assert_eq!(pos.to_string(), "10:5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
    /// Byte offset from the start of the source file
    pub offset: usize,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single frame in a call stack.
///
/// # Examples
///
/// ```
/// use core_types::StackFrame;
///
/// let frame = StackFrame::named("setTimeout callback");
/// assert_eq!(frame.to_string(), "at setTimeout callback (<host>)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Name of the function, or None for anonymous functions
    pub function_name: Option<String>,
    /// URL or file path of the source, or None if not available
    pub source_url: Option<String>,
    /// Line number where the call occurred
    pub line: u32,
    /// Column number where the call occurred
    pub column: u32,
}

impl StackFrame {
    /// A frame with a function name and no source location.
    pub fn named(function_name: impl Into<String>) -> Self {
        Self {
            function_name: Some(function_name.into()),
            source_url: None,
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.function_name.as_deref().unwrap_or("<anonymous>");
        match &self.source_url {
            Some(url) => write!(f, "at {} ({}:{}:{})", name, url, self.line, self.column),
            None => write!(f, "at {} (<host>)", name),
        }
    }
}
