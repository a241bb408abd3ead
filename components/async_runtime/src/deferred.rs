//! Deferred values: single-assignment result containers with chained
//! continuations.
//!
//! A [`DeferredValue`] starts pending and settles at most once. Continuations
//! registered with [`DeferredValue::then`] and friends always run as
//! microtasks on the owning event loop, even when the value is already
//! settled at registration time.
//!
//! Resolving with another deferred value adopts it: the resolving value
//! enters an internal adopting state and registers one reaction on the
//! adopted value. Chains of adoption therefore settle one microtask hop at a
//! time and never recurse on the native stack.

use crate::event_loop::{Handle, Shared};
use crate::suspension::FrameId;
use crate::task_queue::MicroTask;
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Observable state of a deferred value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    /// Not settled yet (including while adopting another value)
    Pending,
    /// Settled with a value
    Fulfilled,
    /// Settled with an error
    Rejected,
}

/// The final result of a settled deferred value.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Fulfilled with a value
    Fulfilled(Value),
    /// Rejected with a reason
    Rejected(JsError),
}

impl Outcome {
    /// Converts into a `Result`.
    pub fn into_result(self) -> Result<Value, JsError> {
        match self {
            Outcome::Fulfilled(value) => Ok(value),
            Outcome::Rejected(error) => Err(error),
        }
    }

    /// The matching [`DeferredState`].
    pub fn state(&self) -> DeferredState {
        match self {
            Outcome::Fulfilled(_) => DeferredState::Fulfilled,
            Outcome::Rejected(_) => DeferredState::Rejected,
        }
    }
}

impl From<Result<Value, JsError>> for Outcome {
    fn from(result: Result<Value, JsError>) -> Self {
        match result {
            Ok(value) => Outcome::Fulfilled(value),
            Err(error) => Outcome::Rejected(error),
        }
    }
}

/// What a continuation hands back: a plain value, or a deferred value to
/// adopt.
///
/// There is no way to fulfill a deferred value with another deferred value,
/// so a deferred-of-deferred can never be observed.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Fulfill with this value
    Value(Value),
    /// Adopt the outcome of this deferred value
    Deferred(DeferredValue),
}

impl From<Value> for Resolution {
    fn from(value: Value) -> Self {
        Resolution::Value(value)
    }
}

impl From<DeferredValue> for Resolution {
    fn from(deferred: DeferredValue) -> Self {
        Resolution::Deferred(deferred)
    }
}

impl From<&DeferredValue> for Resolution {
    fn from(deferred: &DeferredValue) -> Self {
        Resolution::Deferred(deferred.clone())
    }
}

impl From<()> for Resolution {
    fn from(_: ()) -> Self {
        Resolution::Value(Value::Undefined)
    }
}

impl From<bool> for Resolution {
    fn from(b: bool) -> Self {
        Resolution::Value(Value::Boolean(b))
    }
}

impl From<i32> for Resolution {
    fn from(n: i32) -> Self {
        Resolution::Value(Value::Smi(n))
    }
}

impl From<f64> for Resolution {
    fn from(n: f64) -> Self {
        Resolution::Value(Value::Double(n))
    }
}

impl From<&str> for Resolution {
    fn from(s: &str) -> Self {
        Resolution::Value(Value::from(s))
    }
}

impl From<String> for Resolution {
    fn from(s: String) -> Self {
        Resolution::Value(Value::String(s))
    }
}

/// Continuation run when the source fulfills.
pub type FulfillHandler = Box<dyn FnOnce(Value) -> Result<Resolution, JsError>>;

/// Continuation run when the source rejects.
pub type RejectHandler = Box<dyn FnOnce(JsError) -> Result<Resolution, JsError>>;

type ObserveHandler = Box<dyn FnOnce(Outcome) -> Result<(), JsError>>;

/// A continuation waiting on a deferred value.
pub(crate) enum Reaction {
    /// User continuation pair settling a derived value
    Then {
        on_fulfilled: Option<FulfillHandler>,
        on_rejected: Option<RejectHandler>,
        derived: DeferredValue,
    },
    /// Callback that sees the outcome and derives nothing
    Observe(ObserveHandler),
    /// Settles an adopting value with the adopted value's outcome
    Adopt { target: DeferredValue },
    /// Resumes a suspended computation
    Resume { frame: FrameId },
}

impl Reaction {
    fn into_microtask(self, outcome: Outcome, shared: &Rc<Shared>) -> MicroTask {
        match self {
            Reaction::Then {
                on_fulfilled,
                on_rejected,
                derived,
            } => MicroTask::new(move || {
                let result = match outcome {
                    Outcome::Fulfilled(value) => match on_fulfilled {
                        Some(handler) => handler(value),
                        None => Ok(Resolution::Value(value)),
                    },
                    Outcome::Rejected(error) => match on_rejected {
                        Some(handler) => handler(error),
                        None => Err(error),
                    },
                };
                match result {
                    Ok(resolution) => derived.resolve(resolution),
                    Err(error) => derived.reject(error),
                }
                Ok(())
            }),
            Reaction::Observe(callback) => MicroTask::new(move || callback(outcome)),
            Reaction::Adopt { target } => MicroTask::new(move || {
                target.transition(outcome, true);
                Ok(())
            }),
            Reaction::Resume { frame } => {
                let shared = Rc::downgrade(shared);
                MicroTask::new(move || {
                    if let Some(shared) = shared.upgrade() {
                        Handle::from_shared(shared).resume_frame(frame, outcome);
                    }
                    Ok(())
                })
            }
        }
    }
}

enum Status {
    Pending,
    Adopting,
    Settled(Outcome),
}

struct DeferredInner {
    status: Status,
    reactions: Vec<Reaction>,
    handled: bool,
    shared: Weak<Shared>,
}

impl Drop for DeferredInner {
    fn drop(&mut self) {
        if self.handled {
            return;
        }
        if let Status::Settled(Outcome::Rejected(reason)) = &self.status {
            if let Some(shared) = self.shared.upgrade() {
                shared.report_unhandled_rejection(reason.clone());
            }
        }
    }
}

/// A promise-like value owned by one event loop.
///
/// Clones are handles to the same underlying value. Create one through a
/// loop [`Handle`]:
///
/// ```
/// use async_runtime::{DeferredState, EventLoop, LoopConfig};
/// use core_types::Value;
///
/// let mut event_loop = EventLoop::new(LoopConfig::virtual_time());
/// let handle = event_loop.handle();
///
/// let doubled = handle.resolved(21).then(|v| match v {
///     Value::Smi(n) => Ok(Value::Smi(n * 2)),
///     other => Ok(other),
/// });
/// assert_eq!(doubled.state(), DeferredState::Pending);
///
/// event_loop.run(|_| Ok(())).unwrap();
/// assert_eq!(doubled.value(), Some(Value::Smi(42)));
/// ```
#[derive(Clone)]
pub struct DeferredValue(Rc<RefCell<DeferredInner>>);

impl DeferredValue {
    pub(crate) fn new_in(shared: Weak<Shared>) -> Self {
        DeferredValue(Rc::new(RefCell::new(DeferredInner {
            status: Status::Pending,
            reactions: Vec::new(),
            handled: false,
            shared,
        })))
    }

    fn derive(&self) -> DeferredValue {
        DeferredValue::new_in(self.0.borrow().shared.clone())
    }

    /// Current observable state.
    pub fn state(&self) -> DeferredState {
        match &self.0.borrow().status {
            Status::Pending | Status::Adopting => DeferredState::Pending,
            Status::Settled(outcome) => outcome.state(),
        }
    }

    /// True until settled.
    pub fn is_pending(&self) -> bool {
        self.state() == DeferredState::Pending
    }

    /// The outcome, once settled.
    pub fn outcome(&self) -> Option<Outcome> {
        match &self.0.borrow().status {
            Status::Settled(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// The fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<Value> {
        match self.outcome()? {
            Outcome::Fulfilled(value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    /// The rejection reason, if rejected.
    pub fn error(&self) -> Option<JsError> {
        match self.outcome()? {
            Outcome::Rejected(error) => Some(error),
            Outcome::Fulfilled(_) => None,
        }
    }

    /// True when both handles refer to the same deferred value.
    pub fn ptr_eq(&self, other: &DeferredValue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Resolves with a value, or adopts another deferred value.
    ///
    /// Resolving a value with itself rejects it with a `TypeError`. Calls
    /// after settlement, or while adopting, are ignored.
    pub fn resolve(&self, resolution: impl Into<Resolution>) {
        match resolution.into() {
            Resolution::Value(value) => self.transition(Outcome::Fulfilled(value), false),
            Resolution::Deferred(other) if other.ptr_eq(self) => self.transition(
                Outcome::Rejected(JsError::type_error("Chaining cycle detected for promise")),
                false,
            ),
            Resolution::Deferred(other) => {
                {
                    let mut inner = self.0.borrow_mut();
                    if !matches!(inner.status, Status::Pending) {
                        tracing::trace!("ignoring resolution of an already resolved value");
                        return;
                    }
                    inner.status = Status::Adopting;
                }
                other.add_reaction(Reaction::Adopt {
                    target: self.clone(),
                });
            }
        }
    }

    /// Rejects with `error`. Ignored once settled or adopting.
    pub fn reject(&self, error: JsError) {
        self.transition(Outcome::Rejected(error), false);
    }

    /// Settles with an outcome. Ignored once settled or adopting.
    pub fn settle(&self, outcome: Outcome) {
        self.transition(outcome, false);
    }

    fn transition(&self, outcome: Outcome, from_adoption: bool) {
        let (reactions, shared) = {
            let mut inner = self.0.borrow_mut();
            match inner.status {
                Status::Pending => {}
                Status::Adopting if from_adoption => {}
                _ => {
                    tracing::trace!(state = ?outcome.state(), "ignoring second settlement");
                    return;
                }
            }
            inner.status = Status::Settled(outcome.clone());
            (std::mem::take(&mut inner.reactions), inner.shared.clone())
        };
        if reactions.is_empty() {
            return;
        }
        let Some(shared) = shared.upgrade() else {
            tracing::debug!("event loop is gone; dropping reactions");
            return;
        };
        for reaction in reactions {
            shared
                .microtasks
                .enqueue(reaction.into_microtask(outcome.clone(), &shared));
        }
    }

    /// Queues `reaction`, immediately as a microtask if already settled.
    pub(crate) fn add_reaction(&self, reaction: Reaction) {
        let (outcome, shared) = {
            let mut inner = self.0.borrow_mut();
            inner.handled = true;
            match &inner.status {
                Status::Settled(outcome) => (outcome.clone(), inner.shared.clone()),
                Status::Pending | Status::Adopting => {
                    inner.reactions.push(reaction);
                    return;
                }
            }
        };
        match shared.upgrade() {
            Some(shared) => shared
                .microtasks
                .enqueue(reaction.into_microtask(outcome, &shared)),
            None => tracing::debug!("event loop is gone; dropping reaction"),
        }
    }

    /// Registers an optional continuation pair and returns the derived value.
    ///
    /// A missing continuation passes the outcome through unchanged. A
    /// continuation returning `Err` rejects the derived value.
    pub fn register(
        &self,
        on_fulfilled: Option<FulfillHandler>,
        on_rejected: Option<RejectHandler>,
    ) -> DeferredValue {
        let derived = self.derive();
        self.add_reaction(Reaction::Then {
            on_fulfilled,
            on_rejected,
            derived: derived.clone(),
        });
        derived
    }

    /// Continuation for fulfillment; rejections pass through.
    pub fn then<F, R>(&self, on_fulfilled: F) -> DeferredValue
    where
        F: FnOnce(Value) -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
    {
        self.register(
            Some(Box::new(move |value| on_fulfilled(value).map(Into::into))),
            None,
        )
    }

    /// Continuation for rejection; fulfillments pass through.
    pub fn catch<F, R>(&self, on_rejected: F) -> DeferredValue
    where
        F: FnOnce(JsError) -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
    {
        self.register(
            None,
            Some(Box::new(move |error| on_rejected(error).map(Into::into))),
        )
    }

    /// Continuations for both outcomes.
    pub fn then_with<F, R, G, S>(&self, on_fulfilled: F, on_rejected: G) -> DeferredValue
    where
        F: FnOnce(Value) -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
        G: FnOnce(JsError) -> Result<S, JsError> + 'static,
        S: Into<Resolution>,
    {
        self.register(
            Some(Box::new(move |value| on_fulfilled(value).map(Into::into))),
            Some(Box::new(move |error| on_rejected(error).map(Into::into))),
        )
    }

    /// Runs `on_finally` on either outcome, then passes the original outcome
    /// through.
    ///
    /// If `on_finally` returns a deferred value the derived value waits for
    /// it. A failure of `on_finally` replaces the original outcome.
    pub fn finally<F, R>(&self, on_finally: F) -> DeferredValue
    where
        F: FnOnce() -> Result<R, JsError> + 'static,
        R: Into<Resolution>,
    {
        let derived = self.derive();
        let target = derived.clone();
        self.observe(move |outcome| {
            match on_finally().map(Into::into) {
                Err(error) => target.reject(error),
                Ok(Resolution::Value(_)) => target.settle(outcome),
                Ok(Resolution::Deferred(waited)) => waited.observe(move |finished| {
                    match finished {
                        Outcome::Rejected(error) => target.reject(error),
                        Outcome::Fulfilled(_) => target.settle(outcome),
                    }
                    Ok(())
                }),
            }
            Ok(())
        });
        derived
    }

    /// Runs `callback` as a microtask once settled, without deriving a new
    /// value. An error from the callback is reported as uncaught.
    pub fn observe<F>(&self, callback: F)
    where
        F: FnOnce(Outcome) -> Result<(), JsError> + 'static,
    {
        self.add_reaction(Reaction::Observe(Box::new(callback)));
    }
}

impl fmt::Debug for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        let mut s = f.debug_struct("DeferredValue");
        match &inner.status {
            Status::Pending => s.field("state", &"pending"),
            Status::Adopting => s.field("state", &"adopting"),
            Status::Settled(outcome) => s.field("outcome", outcome),
        };
        s.field("reactions", &inner.reactions.len()).finish()
    }
}

/// Settles the deferred value handed to a [`Handle::promise`] executor.
#[derive(Debug, Clone)]
pub struct Resolver {
    deferred: DeferredValue,
}

impl Resolver {
    pub(crate) fn new(deferred: DeferredValue) -> Self {
        Self { deferred }
    }

    /// Resolves (or adopts). Ignored after the first settlement.
    pub fn resolve(&self, resolution: impl Into<Resolution>) {
        self.deferred.resolve(resolution);
    }

    /// Rejects. Ignored after the first settlement.
    pub fn reject(&self, error: JsError) {
        self.deferred.reject(error);
    }
}
