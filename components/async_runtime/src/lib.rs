//! Async runtime for script execution.
//!
//! This crate provides the task scheduler of the runtime:
//! - [`EventLoop`] - drives the top-level program, microtask drains and
//!   timer macrotasks in the required order
//! - [`DeferredValue`] - promise-like single-settlement values with chained
//!   continuations and iterative adoption
//! - [`MicrotaskQueue`] - the single FIFO queue every microtask source shares
//! - [`TimerHeap`] - pending timers ordered by fire time, then insertion
//! - [`SuspendScope`] - suspend points for sequential computations started
//!   with [`Handle::spawn_async`]
//! - [`HostCompleter`] - keep-alive work completed from other threads
//!
//! Everything is single-threaded. All scheduler state lives in one loop
//! instance and is reached through a [`Handle`]; there are no globals.
//!
//! # Examples
//!
//! ```
//! use async_runtime::{EventLoop, LoopConfig};
//! use core_types::Value;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let mut event_loop = EventLoop::new(LoopConfig::virtual_time());
//!
//! let l = log.clone();
//! let report = event_loop
//!     .run(move |handle| {
//!         let l2 = l.clone();
//!         handle.resolved(Value::from("x")).then(move |v| {
//!             l2.borrow_mut().push(v.to_js_string());
//!             Ok(())
//!         });
//!         l.borrow_mut().push("sync".to_string());
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(*log.borrow(), vec!["sync", "x"]);
//! assert_eq!(report.microtasks_run, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod combinators;
pub mod config;
pub mod deferred;
pub mod diagnostics;
pub mod error;
pub mod event_loop;
pub mod host_op;
pub mod suspension;
pub mod task_queue;
pub mod timer_heap;

// Re-export main types at crate root
pub use clock::{Clock, SystemClock, VirtualClock};
pub use config::{LoopConfig, TimeSource};
pub use deferred::{
    DeferredState, DeferredValue, FulfillHandler, Outcome, RejectHandler, Resolution, Resolver,
};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TaskSource, TracingSink};
pub use error::LoopError;
pub use event_loop::{EventLoop, Handle, LoopPhase, RunReport};
pub use host_op::{HostCompleter, HostOpId};
pub use suspension::{FrameId, Suspend, SuspendScope};
pub use task_queue::{MicroTask, MicrotaskQueue};
pub use timer_heap::{TimerCallback, TimerEntry, TimerHeap, TimerId, MIN_INTERVAL};
