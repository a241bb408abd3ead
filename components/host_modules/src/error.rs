//! Errors raised by host modules.

use core_types::{ErrorKind, JsError};
use thiserror::Error;

/// Failure of a host module call.
///
/// Host calls are synchronous: the error goes straight back to the caller
/// and never passes through the scheduler.
#[derive(Debug, Error)]
pub enum HostError {
    /// The path does not exist
    #[error("ENOENT: no such file or directory, '{path}'")]
    NotFound {
        /// The path as given by the caller
        path: String,
    },

    /// Any other I/O failure (permissions, not a directory, ...)
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The path as given by the caller
        path: String,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// `require` of a name no module is registered under
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// A call argument was unusable
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl HostError {
    /// Classifies an I/O error for `path`.
    pub fn from_io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            HostError::NotFound {
                path: path.to_string(),
            }
        } else {
            HostError::Io {
                path: path.to_string(),
                source,
            }
        }
    }

    /// True for [`HostError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostError::NotFound { .. })
    }
}

impl From<HostError> for JsError {
    fn from(err: HostError) -> Self {
        let kind = match &err {
            HostError::InvalidArgument(_) => ErrorKind::TypeError,
            _ => ErrorKind::Error,
        };
        JsError::new(kind, err.to_string())
    }
}
