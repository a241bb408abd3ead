//! Microtask queue management.
//!
//! Microtasks are drained to exhaustion after the top-level program and after
//! every macrotask. Tasks enqueued while draining run in the same drain.

use core_types::JsError;
use std::cell::RefCell;
use std::collections::VecDeque;

/// A microtask to be executed by the event loop.
///
/// Microtasks come from `queue_microtask`, deferred value reactions, and
/// resumption of suspended computations. All of them share one FIFO queue.
pub struct MicroTask {
    callback: Box<dyn FnOnce() -> Result<(), JsError>>,
}

impl MicroTask {
    /// Creates a new MicroTask from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the microtask.
    pub fn run(self) -> Result<(), JsError> {
        (self.callback)()
    }
}

impl std::fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MicroTask {{ ... }}")
    }
}

/// A FIFO queue for microtasks.
///
/// The queue uses interior mutability so a running microtask can enqueue
/// more work through a shared handle while the loop is draining.
#[derive(Default)]
pub struct MicrotaskQueue {
    queue: RefCell<VecDeque<MicroTask>>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&self, microtask: MicroTask) {
        self.queue.borrow_mut().push_back(microtask);
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Runs microtasks from the head until the queue is empty, including any
    /// enqueued along the way. Failures go to `on_error` and draining
    /// continues. Returns how many tasks ran.
    pub(crate) fn drain(&self, mut on_error: impl FnMut(JsError)) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            ran += 1;
            if let Err(error) = task.run() {
                on_error(error);
            }
        }
        ran
    }

    /// Discards every queued microtask without running it.
    pub(crate) fn clear(&self) -> usize {
        let discarded = std::mem::take(&mut *self.queue.borrow_mut());
        let count = discarded.len();
        // closures are dropped outside the borrow; they may own loop handles
        drop(discarded);
        count
    }
}

impl std::fmt::Debug for MicrotaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MicrotaskQueue").field("len", &self.len()).finish()
    }
}
