//! Loop-level errors.

use core_types::JsError;
use thiserror::Error;

/// Errors returned by [`EventLoop::run`](crate::EventLoop::run).
///
/// Failures inside scheduled tasks never surface here; they go to the
/// diagnostic sink and the loop keeps going.
#[derive(Debug, Error)]
pub enum LoopError {
    /// The top-level program can only run once per loop instance
    #[error("event loop has already run")]
    AlreadyStarted,

    /// The top-level program failed before the loop started
    #[error("top-level program failed: {0}")]
    Startup(#[source] JsError),
}
