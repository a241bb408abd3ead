//! Host operations: keep-alive work completed from outside the loop.
//!
//! A host operation pairs a pending [`DeferredValue`] on the loop thread with
//! a `Send` [`HostCompleter`]. The completer may move to a worker thread; its
//! result travels back over a channel and settles the deferred value as a
//! macrotask. The loop does not stop while any host operation is outstanding.

use crate::deferred::{DeferredValue, Outcome};
use crate::event_loop::Handle;
use core_types::{JsError, Value};
use crossbeam::channel::Sender;
use std::fmt;

/// Identifies an outstanding host operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostOpId(u64);

/// Message from a completer to the loop.
#[derive(Debug)]
pub(crate) enum RemoteMessage {
    Settle { id: HostOpId, outcome: Outcome },
    Abandoned { id: HostOpId },
}

impl RemoteMessage {
    pub(crate) fn into_parts(self) -> (HostOpId, Outcome) {
        match self {
            RemoteMessage::Settle { id, outcome } => (id, outcome),
            RemoteMessage::Abandoned { id } => (
                id,
                Outcome::Rejected(JsError::internal("host operation abandoned")),
            ),
        }
    }
}

/// Completes one host operation, from any thread.
///
/// Dropping a completer without completing it rejects the operation.
///
/// ```
/// use async_runtime::{EventLoop, LoopConfig};
/// use core_types::Value;
///
/// let mut event_loop = EventLoop::new(LoopConfig::virtual_time());
/// let (result, completer) = event_loop.handle().host_operation();
///
/// std::thread::spawn(move || completer.fulfill(Value::from("done")));
///
/// event_loop.run(|_| Ok(())).unwrap();
/// assert_eq!(result.value(), Some(Value::from("done")));
/// ```
pub struct HostCompleter {
    id: HostOpId,
    tx: Sender<RemoteMessage>,
    completed: bool,
}

impl HostCompleter {
    /// Fulfills the operation.
    pub fn fulfill(self, value: Value) {
        self.complete(Outcome::Fulfilled(value));
    }

    /// Rejects the operation.
    pub fn reject(self, error: JsError) {
        self.complete(Outcome::Rejected(error));
    }

    /// Settles the operation with `outcome`.
    pub fn complete(mut self, outcome: Outcome) {
        self.completed = true;
        self.send(RemoteMessage::Settle {
            id: self.id,
            outcome,
        });
    }

    /// The operation's id.
    pub fn id(&self) -> HostOpId {
        self.id
    }

    fn send(&self, message: RemoteMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!(op = ?self.id, "event loop is gone; dropping host completion");
        }
    }
}

impl Drop for HostCompleter {
    fn drop(&mut self) {
        if !self.completed {
            self.send(RemoteMessage::Abandoned { id: self.id });
        }
    }
}

impl fmt::Debug for HostCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCompleter")
            .field("id", &self.id)
            .field("completed", &self.completed)
            .finish()
    }
}

impl Handle {
    /// Registers a host operation and returns its pending result together
    /// with the completer.
    pub fn host_operation(&self) -> (DeferredValue, HostCompleter) {
        let id = HostOpId(self.shared.next_host_op.get() + 1);
        self.shared.next_host_op.set(id.0);
        let deferred = self.pending();
        self.shared
            .host_ops
            .borrow_mut()
            .insert(id, deferred.clone());
        tracing::debug!(op = ?id, "host operation started");
        let completer = HostCompleter {
            id,
            tx: self.shared.remote_tx.clone(),
            completed: false,
        };
        (deferred, completer)
    }

    /// Number of host operations not completed yet.
    pub fn outstanding_host_operations(&self) -> usize {
        self.shared.host_ops.borrow().len()
    }
}
