//! Diagnostic sink for failures the loop absorbs.
//!
//! Task failures and unhandled rejections never stop the loop. They are
//! handed to a [`DiagnosticSink`] instead: [`TracingSink`] logs them, and
//! [`CollectingSink`] keeps them for assertions.

use crate::timer_heap::TimerId;
use core_types::JsError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Which kind of scheduled unit raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSource {
    /// A microtask (queued callback, reaction, or resume)
    Microtask,
    /// A timer callback
    Timer(TimerId),
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskSource::Microtask => write!(f, "microtask"),
            TaskSource::Timer(id) => write!(f, "timer {}", id),
        }
    }
}

/// A failure reported by the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A rejected deferred value was dropped without any reaction registered
    UnhandledRejection {
        /// The rejection reason
        reason: JsError,
    },
    /// A microtask or macrotask callback returned an error
    UncaughtError {
        /// Where the error came from
        source: TaskSource,
        /// The error itself
        error: JsError,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnhandledRejection { reason } => {
                write!(f, "Unhandled promise rejection: {}", reason)
            }
            Diagnostic::UncaughtError { source, error } => {
                write!(f, "Uncaught exception in {}: {}", source, error)
            }
        }
    }
}

/// Receives diagnostics from the loop.
pub trait DiagnosticSink {
    /// Records one diagnostic. Must not call back into the loop.
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: logs every diagnostic at `warn` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::UnhandledRejection { reason } => {
                tracing::warn!(%reason, "unhandled promise rejection");
            }
            Diagnostic::UncaughtError { source, error } => {
                tracing::warn!(%source, %error, "uncaught exception in scheduled task");
            }
        }
    }
}

/// Sink that stores diagnostics in memory.
///
/// Clones share the same buffer, so a test keeps one clone and hands the
/// other to the loop.
///
/// # Examples
///
/// ```
/// use async_runtime::{CollectingSink, Diagnostic, DiagnosticSink};
/// use core_types::JsError;
///
/// let sink = CollectingSink::new();
/// sink.report(Diagnostic::UnhandledRejection { reason: JsError::type_error("x") });
/// assert_eq!(sink.unhandled_rejections().len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    reports: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.reports.borrow().clone()
    }

    /// Reasons of unhandled rejections, in report order.
    pub fn unhandled_rejections(&self) -> Vec<JsError> {
        self.reports
            .borrow()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::UnhandledRejection { reason } => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }

    /// Errors raised by scheduled tasks, in report order.
    pub fn uncaught_errors(&self) -> Vec<JsError> {
        self.reports
            .borrow()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::UncaughtError { error, .. } => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// True when nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.reports.borrow_mut().push(diagnostic);
    }
}
