//! Event loop implementation.
//!
//! The loop owns every piece of scheduler state (microtask queue, timer
//! heap, suspended frames, outstanding host operations) in one [`Shared`]
//! context. Nothing is global, so independent loops can coexist in one
//! process. External code reaches the context only through a [`Handle`],
//! which can enqueue, schedule and cancel work but never execute it.

use crate::clock::Clock;
use crate::config::LoopConfig;
use crate::deferred::{DeferredValue, Resolution, Resolver};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TaskSource, TracingSink};
use crate::error::LoopError;
use crate::host_op::{HostOpId, RemoteMessage};
use crate::suspension::SuspensionAdapter;
use crate::task_queue::{MicroTask, MicrotaskQueue};
use crate::timer_heap::{TimerCallback, TimerEntry, TimerHeap, TimerId};
use core_types::{JsError, StackFrame};
use crossbeam::channel::{self, Receiver, Sender};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Where the loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Created, not started
    Idle,
    /// Running the top-level program
    RunningSync,
    /// Draining the microtask queue
    DrainingMicrotasks,
    /// Running one timer callback or host completion
    RunningMacrotask,
    /// Finished; the loop cannot be restarted
    Stopped,
}

/// Counters collected over one [`EventLoop::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Timer callbacks and host completions dispatched
    pub macrotasks_run: usize,
    /// Microtasks executed across all drains
    pub microtasks_run: usize,
    /// Timer callbacks dispatched
    pub timers_fired: usize,
    /// Task failures reported to the diagnostic sink
    pub uncaught_errors: usize,
    /// Live timers left when the loop stopped
    pub unfired_timers: usize,
    /// Computations still waiting on a suspend point when the loop stopped
    pub suspended_frames: usize,
    /// Clock time between start and stop
    pub elapsed_ms: u64,
}

/// Scheduler state shared between the loop and its handles.
pub(crate) struct Shared {
    pub(crate) microtasks: MicrotaskQueue,
    pub(crate) timers: RefCell<TimerHeap>,
    pub(crate) frames: SuspensionAdapter,
    pub(crate) host_ops: RefCell<HashMap<HostOpId, DeferredValue>>,
    pub(crate) next_host_op: Cell<u64>,
    pub(crate) remote_tx: Sender<RemoteMessage>,
    remote_rx: Receiver<RemoteMessage>,
    clock: Rc<dyn Clock>,
    sink: Rc<dyn DiagnosticSink>,
    report_unhandled: bool,
    phase: Cell<LoopPhase>,
    stop_requested: Cell<bool>,
}

impl Shared {
    fn set_phase(&self, phase: LoopPhase) {
        if self.phase.replace(phase) != phase {
            tracing::trace!(?phase, "event loop phase");
        }
    }

    pub(crate) fn report_unhandled_rejection(&self, reason: JsError) {
        if self.report_unhandled {
            self.sink.report(Diagnostic::UnhandledRejection { reason });
        }
    }

    fn report_uncaught(&self, source: TaskSource, error: JsError, report: &mut RunReport) {
        report.uncaught_errors += 1;
        self.sink.report(Diagnostic::UncaughtError { source, error });
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("phase", &self.phase.get())
            .field("microtasks", &self.microtasks.len())
            .field("timers", &self.timers.borrow().len())
            .field("frames", &self.frames)
            .field("host_ops", &self.host_ops.borrow().len())
            .finish()
    }
}

/// Cloneable access to a loop's scheduler.
///
/// Handles are how programs, callbacks and host shims schedule work. They
/// never run anything themselves.
#[derive(Clone)]
pub struct Handle {
    pub(crate) shared: Rc<Shared>,
}

impl Handle {
    pub(crate) fn from_shared(shared: Rc<Shared>) -> Self {
        Self { shared }
    }

    /// Appends a microtask to the loop's single FIFO queue.
    pub fn queue_microtask<F>(&self, f: F)
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        self.shared.microtasks.enqueue(MicroTask::new(f));
    }

    fn schedule(&self, callback: TimerCallback, delay_ms: i64) -> TimerId {
        let delay = if delay_ms < 0 {
            tracing::debug!(delay_ms, "negative timer delay treated as zero");
            Duration::ZERO
        } else {
            Duration::from_millis(delay_ms as u64)
        };
        let now = self.shared.clock.now();
        self.shared.timers.borrow_mut().schedule(callback, delay, now)
    }

    /// Runs `f` once, no earlier than `delay_ms` from now.
    pub fn set_timeout<F>(&self, f: F, delay_ms: i64) -> TimerId
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        self.schedule(
            TimerCallback::once(move || {
                f().map_err(|e| e.with_frame(StackFrame::named("setTimeout callback")))
            }),
            delay_ms,
        )
    }

    /// Runs `f` every `delay_ms` until cancelled.
    pub fn set_interval<F>(&self, mut f: F, delay_ms: i64) -> TimerId
    where
        F: FnMut() -> Result<(), JsError> + 'static,
    {
        self.schedule(
            TimerCallback::repeating(move || {
                f().map_err(|e| e.with_frame(StackFrame::named("setInterval callback")))
            }),
            delay_ms,
        )
    }

    /// Runs `f` once as a zero-delay timer.
    pub fn set_immediate<F>(&self, f: F) -> TimerId
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        self.schedule(
            TimerCallback::once(move || {
                f().map_err(|e| e.with_frame(StackFrame::named("setImmediate callback")))
            }),
            0,
        )
    }

    /// Cancels a timer. Unknown or already fired ids are ignored.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let cancelled = self.shared.timers.borrow_mut().cancel(id);
        tracing::trace!(timer = %id, cancelled, "clear timer");
        cancelled
    }

    /// Cancels an interval, including from inside its own callback.
    pub fn clear_interval(&self, id: TimerId) -> bool {
        self.clear_timeout(id)
    }

    /// Cancels an immediate.
    pub fn clear_immediate(&self, id: TimerId) -> bool {
        self.clear_timeout(id)
    }

    /// A new pending deferred value owned by this loop.
    pub fn pending(&self) -> DeferredValue {
        DeferredValue::new_in(Rc::downgrade(&self.shared))
    }

    /// A value resolved with `resolution`. A deferred value is returned
    /// unchanged.
    pub fn resolved(&self, resolution: impl Into<Resolution>) -> DeferredValue {
        match resolution.into() {
            Resolution::Deferred(deferred) => deferred,
            Resolution::Value(value) => {
                let deferred = self.pending();
                deferred.resolve(value);
                deferred
            }
        }
    }

    /// A value rejected with `error`.
    pub fn rejected(&self, error: JsError) -> DeferredValue {
        let deferred = self.pending();
        deferred.reject(error);
        deferred
    }

    /// Runs `executor` synchronously with a [`Resolver`]. An error returned
    /// by the executor rejects the value unless it was already settled.
    pub fn promise<F>(&self, executor: F) -> DeferredValue
    where
        F: FnOnce(Resolver) -> Result<(), JsError>,
    {
        let deferred = self.pending();
        if let Err(error) = executor(Resolver::new(deferred.clone())) {
            deferred.reject(error);
        }
        deferred
    }

    /// Asks the loop to stop after the current macrotask and its drain.
    pub fn request_stop(&self) {
        tracing::debug!("stop requested");
        self.shared.stop_requested.set(true);
    }

    /// Current loop time.
    pub fn now(&self) -> Duration {
        self.shared.clock.now()
    }

    /// Current loop phase.
    pub fn phase(&self) -> LoopPhase {
        self.shared.phase.get()
    }

    /// Microtasks waiting to run.
    pub fn queued_microtasks(&self) -> usize {
        self.shared.microtasks.len()
    }

    /// Live timers.
    pub fn pending_timers(&self) -> usize {
        self.shared.timers.borrow().len()
    }

    /// Computations waiting on a suspend point.
    pub fn suspended_frames(&self) -> usize {
        self.shared.frames.len()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("shared", &self.shared).finish()
    }
}

/// The event loop.
///
/// Each run goes through these steps:
/// 1. Run the top-level program, then drain all microtasks
/// 2. Fire every due timer, draining microtasks after each one
/// 3. Settle every completed host operation, draining after each one
/// 4. If nothing was due, idle until the next timer or host completion
/// 5. Stop once no microtask, live timer or host operation remains
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, LoopConfig};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let mut event_loop = EventLoop::new(LoopConfig::virtual_time());
///
/// let l = log.clone();
/// event_loop
///     .run(move |handle| {
///         let l2 = l.clone();
///         handle.set_timeout(move || Ok(l2.borrow_mut().push("timer")), 0);
///         let l3 = l.clone();
///         handle.queue_microtask(move || Ok(l3.borrow_mut().push("microtask")));
///         l.borrow_mut().push("sync");
///         Ok(())
///     })
///     .unwrap();
///
/// assert_eq!(*log.borrow(), vec!["sync", "microtask", "timer"]);
/// ```
pub struct EventLoop {
    shared: Rc<Shared>,
    config: LoopConfig,
}

impl EventLoop {
    /// Creates a loop that reports diagnostics through `tracing`.
    pub fn new(config: LoopConfig) -> Self {
        Self::with_sink(config, Rc::new(TracingSink))
    }

    /// Creates a loop that reports diagnostics to `sink`.
    pub fn with_sink(config: LoopConfig, sink: Rc<dyn DiagnosticSink>) -> Self {
        let (remote_tx, remote_rx) = channel::unbounded();
        let shared = Rc::new(Shared {
            microtasks: MicrotaskQueue::new(),
            timers: RefCell::new(TimerHeap::new()),
            frames: SuspensionAdapter::default(),
            host_ops: RefCell::new(HashMap::new()),
            next_host_op: Cell::new(0),
            remote_tx,
            remote_rx,
            clock: config.build_clock(),
            sink,
            report_unhandled: config.report_unhandled_rejections,
            phase: Cell::new(LoopPhase::Idle),
            stop_requested: Cell::new(false),
        });
        Self { shared, config }
    }

    /// A handle for scheduling work on this loop.
    pub fn handle(&self) -> Handle {
        Handle::from_shared(self.shared.clone())
    }

    /// Current loop phase.
    pub fn phase(&self) -> LoopPhase {
        self.shared.phase.get()
    }

    /// The configuration this loop was built with.
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Runs `program` as the top-level synchronous unit, then drives the loop
    /// until no work remains or a stop condition is met.
    ///
    /// A program error is fatal and aborts startup. Errors raised later by
    /// scheduled tasks go to the diagnostic sink and the loop continues.
    pub fn run<F>(&mut self, program: F) -> Result<RunReport, LoopError>
    where
        F: FnOnce(&Handle) -> Result<(), JsError>,
    {
        if self.phase() != LoopPhase::Idle {
            return Err(LoopError::AlreadyStarted);
        }
        let shared = self.shared.clone();
        let handle = self.handle();
        let started = shared.clock.now();
        let deadline = self.config.shutdown_after().map(|after| started + after);
        let mut report = RunReport::default();
        tracing::debug!(time_source = ?self.config.time_source, "event loop starting");

        shared.set_phase(LoopPhase::RunningSync);
        if let Err(error) = program(&handle) {
            shared.set_phase(LoopPhase::Stopped);
            self.shutdown();
            return Err(LoopError::Startup(error));
        }
        self.drain(&mut report);

        let mut inbox: Vec<RemoteMessage> = Vec::new();
        loop {
            if shared.stop_requested.get() {
                tracing::debug!("stopping on request");
                break;
            }
            if deadline.is_some_and(|deadline| shared.clock.now() >= deadline) {
                tracing::debug!("stopping at shutdown deadline");
                break;
            }

            let mut progressed = false;

            // one entry per macrotask, so earlier callbacks can cancel later ones
            let now = shared.clock.now();
            loop {
                let entry = shared.timers.borrow_mut().pop_next_due(now);
                let Some(entry) = entry else {
                    break;
                };
                progressed = true;
                self.fire_timer(entry, &mut report);
                if shared.stop_requested.get() {
                    break;
                }
            }
            if shared.stop_requested.get() {
                continue;
            }

            inbox.extend(shared.remote_rx.try_iter());
            let mut pending = inbox.drain(..);
            for message in pending.by_ref() {
                progressed = true;
                self.complete_host_op(message, &mut report);
                if shared.stop_requested.get() {
                    break;
                }
            }
            let abandoned = pending.len();
            drop(pending);
            if abandoned > 0 {
                tracing::debug!(abandoned, "host completions left unprocessed at stop");
            }
            if progressed {
                continue;
            }

            let next_timer = shared.timers.borrow_mut().next_fire_time();
            let waiting_on_host = !shared.host_ops.borrow().is_empty();
            if next_timer.is_none() && !waiting_on_host {
                break;
            }
            let wake_at = match (next_timer, deadline) {
                (Some(t), Some(d)) => Some(t.min(d)),
                (t, d) => t.or(d),
            };
            if waiting_on_host {
                let received = match wake_at {
                    Some(at) => shared
                        .remote_rx
                        .recv_timeout(shared.clock.real_wait(at))
                        .ok(),
                    None => shared.remote_rx.recv().ok(),
                };
                if let Some(message) = received {
                    inbox.push(message);
                    continue;
                }
            }
            if let Some(at) = wake_at {
                shared.clock.sleep_until(at);
            }
        }

        report.unfired_timers += shared.timers.borrow().len();
        report.suspended_frames = shared.frames.len();
        report.elapsed_ms = shared.clock.now().saturating_sub(started).as_millis() as u64;
        shared.set_phase(LoopPhase::Stopped);
        tracing::debug!(
            macrotasks = report.macrotasks_run,
            microtasks = report.microtasks_run,
            unfired_timers = report.unfired_timers,
            "event loop stopped"
        );
        self.shutdown();
        Ok(report)
    }

    fn drain(&self, report: &mut RunReport) {
        let shared = &self.shared;
        if shared.microtasks.is_empty() {
            return;
        }
        let previous = shared.phase.get();
        shared.set_phase(LoopPhase::DrainingMicrotasks);
        let mut failures = Vec::new();
        report.microtasks_run += shared.microtasks.drain(|error| failures.push(error));
        for error in failures {
            shared.report_uncaught(TaskSource::Microtask, error, report);
        }
        shared.set_phase(previous);
    }

    fn fire_timer(&self, entry: TimerEntry, report: &mut RunReport) {
        let shared = &self.shared;
        let id = entry.id();
        shared.set_phase(LoopPhase::RunningMacrotask);
        tracing::trace!(timer = %id, "firing timer");
        let (result, repeating) = entry.fire();
        report.macrotasks_run += 1;
        report.timers_fired += 1;
        if let Err(error) = result {
            shared.report_uncaught(TaskSource::Timer(id), error, report);
        }
        if let Some(entry) = repeating {
            let now = shared.clock.now();
            let cancelled = shared.timers.borrow_mut().rearm(entry, now);
            match cancelled {
                Some(entry) => drop(entry),
                None => tracing::debug!(timer = %id, "interval re-armed"),
            }
        }
        self.drain(report);
    }

    fn complete_host_op(&self, message: RemoteMessage, report: &mut RunReport) {
        let shared = &self.shared;
        let (id, outcome) = message.into_parts();
        let deferred = shared.host_ops.borrow_mut().remove(&id);
        let Some(deferred) = deferred else {
            tracing::debug!(op = ?id, "completion for unknown host operation");
            return;
        };
        shared.set_phase(LoopPhase::RunningMacrotask);
        tracing::debug!(op = ?id, state = ?outcome.state(), "host operation completed");
        deferred.settle(outcome);
        report.macrotasks_run += 1;
        self.drain(report);
    }

    /// Discards all queued microtasks, timers, host operations and suspended
    /// frames. Runs automatically at the end of [`run`](Self::run) and on
    /// drop.
    pub fn shutdown(&mut self) {
        let shared = &self.shared;
        let microtasks = shared.microtasks.clear();
        let timers = shared.timers.borrow_mut().drain_entries();
        let host_ops = std::mem::take(&mut *shared.host_ops.borrow_mut());
        let frames = shared.frames.clear();
        if microtasks + timers.len() + host_ops.len() + frames > 0 {
            tracing::debug!(
                microtasks,
                timers = timers.len(),
                host_ops = host_ops.len(),
                frames,
                "discarding pending work"
            );
        }
        drop(timers);
        drop(host_ops);
        if shared.phase.get() == LoopPhase::Idle {
            shared.set_phase(LoopPhase::Stopped);
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new(LoopConfig::default())
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("config", &self.config)
            .field("shared", &self.shared)
            .finish()
    }
}
