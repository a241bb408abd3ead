//! Suspension adapter: sequential-looking computations with suspend points.
//!
//! A computation is a Rust future driven by the loop with a no-op waker. It
//! may only yield at [`SuspendScope::suspend`]. When it does, the frame is
//! parked in an id-keyed registry and a resume reaction carrying only the
//! frame id is registered on the awaited deferred value. Resumption runs as
//! a microtask, so suspend points of one computation proceed strictly in
//! program order.

use crate::deferred::{DeferredValue, Outcome, Reaction, Resolution};
use crate::event_loop::Handle;
use core_types::{JsError, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Identifies a suspended computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

type Body = Pin<Box<dyn Future<Output = Result<Resolution, JsError>>>>;

enum SlotState {
    Running,
    Awaiting {
        token: u64,
        operand: Option<DeferredValue>,
    },
    Resumed {
        token: u64,
        outcome: Outcome,
    },
}

/// Hand-off point between a frame and its suspend points.
struct FrameSlot {
    state: RefCell<SlotState>,
    next_token: Cell<u64>,
}

impl FrameSlot {
    fn new() -> Self {
        Self {
            state: RefCell::new(SlotState::Running),
            next_token: Cell::new(0),
        }
    }

    /// Takes the operand of a suspend point that was just reached.
    fn take_operand(&self) -> Option<DeferredValue> {
        match &mut *self.state.borrow_mut() {
            SlotState::Awaiting { operand, .. } => operand.take(),
            _ => None,
        }
    }

    fn resume(&self, outcome: Outcome) -> bool {
        let mut state = self.state.borrow_mut();
        match *state {
            SlotState::Awaiting { token, .. } => {
                *state = SlotState::Resumed { token, outcome };
                true
            }
            _ => false,
        }
    }
}

struct Frame {
    id: FrameId,
    body: Body,
    slot: Rc<FrameSlot>,
    result: DeferredValue,
}

/// Registry of suspended frames, owned by the loop.
#[derive(Default)]
pub(crate) struct SuspensionAdapter {
    frames: RefCell<HashMap<FrameId, Frame>>,
    next_id: Cell<u64>,
}

impl SuspensionAdapter {
    fn next_id(&self) -> FrameId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        FrameId(id)
    }

    fn park(&self, frame: Frame) {
        self.frames.borrow_mut().insert(frame.id, frame);
    }

    fn take(&self, id: FrameId) -> Option<Frame> {
        self.frames.borrow_mut().remove(&id)
    }

    /// Number of frames waiting on a suspend point.
    pub(crate) fn len(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Discards every suspended frame. Their result values stay pending.
    pub(crate) fn clear(&self) -> usize {
        let frames = std::mem::take(&mut *self.frames.borrow_mut());
        let count = frames.len();
        drop(frames);
        count
    }
}

impl fmt::Debug for SuspensionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspensionAdapter")
            .field("suspended", &self.len())
            .finish()
    }
}

/// Passed to an async body; the only way for it to suspend.
#[derive(Clone)]
pub struct SuspendScope {
    slot: Rc<FrameSlot>,
    handle: Handle,
}

impl SuspendScope {
    /// Suspends until `operand` settles.
    ///
    /// A plain value is wrapped in an already fulfilled deferred value, so
    /// the computation still yields for one microtask. A rejection comes
    /// back as `Err`.
    pub fn suspend(&self, operand: impl Into<Resolution>) -> Suspend {
        Suspend {
            slot: self.slot.clone(),
            operand: Some(self.handle.resolved(operand)),
            token: None,
        }
    }

    /// The loop handle, for scheduling from inside the computation.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl fmt::Debug for SuspendScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendScope").finish_non_exhaustive()
    }
}

/// Future returned by [`SuspendScope::suspend`].
#[must_use = "a suspend point does nothing unless awaited"]
pub struct Suspend {
    slot: Rc<FrameSlot>,
    operand: Option<DeferredValue>,
    token: Option<u64>,
}

impl Future for Suspend {
    type Output = Result<Value, JsError>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mut state = this.slot.state.borrow_mut();
        match this.token {
            None => {
                if !matches!(*state, SlotState::Running) {
                    return Poll::Ready(Err(JsError::internal(
                        "suspend points of one computation cannot be awaited concurrently",
                    )));
                }
                let token = this.slot.next_token.get();
                this.slot.next_token.set(token + 1);
                this.token = Some(token);
                *state = SlotState::Awaiting {
                    token,
                    operand: this.operand.take(),
                };
                Poll::Pending
            }
            Some(token) => {
                let resumed = matches!(
                    &*state,
                    SlotState::Resumed { token: t, .. } if *t == token
                );
                if !resumed {
                    return Poll::Pending;
                }
                match std::mem::replace(&mut *state, SlotState::Running) {
                    SlotState::Resumed { outcome, .. } => Poll::Ready(outcome.into_result()),
                    _ => Poll::Pending,
                }
            }
        }
    }
}

impl fmt::Debug for Suspend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspend")
            .field("started", &self.token.is_some())
            .finish()
    }
}

impl Handle {
    /// Starts a sequential computation and returns its deferred result.
    ///
    /// The body runs synchronously up to its first suspend point; the caller
    /// then gets back a pending value. The rest of the body runs later, one
    /// microtask per resumption.
    ///
    /// ```
    /// use async_runtime::{EventLoop, LoopConfig};
    /// use core_types::Value;
    ///
    /// let mut event_loop = EventLoop::new(LoopConfig::virtual_time());
    /// let handle = event_loop.handle();
    ///
    /// let sum = handle.spawn_async(|scope| async move {
    ///     let a = scope.suspend(1).await?;
    ///     let b = scope.suspend(2).await?;
    ///     match (a, b) {
    ///         (Value::Smi(a), Value::Smi(b)) => Ok(Value::Smi(a + b)),
    ///         _ => Ok(Value::Undefined),
    ///     }
    /// });
    /// assert!(sum.is_pending());
    ///
    /// event_loop.run(|_| Ok(())).unwrap();
    /// assert_eq!(sum.value(), Some(Value::Smi(3)));
    /// ```
    pub fn spawn_async<F, Fut, R>(&self, body: F) -> DeferredValue
    where
        F: FnOnce(SuspendScope) -> Fut,
        Fut: Future<Output = Result<R, JsError>> + 'static,
        R: Into<Resolution> + 'static,
    {
        let slot = Rc::new(FrameSlot::new());
        let scope = SuspendScope {
            slot: slot.clone(),
            handle: self.clone(),
        };
        let future = body(scope);
        let frame = Frame {
            id: self.shared.frames.next_id(),
            body: Box::pin(async move { future.await.map(Into::into) }),
            slot,
            result: self.pending(),
        };
        let result = frame.result.clone();
        tracing::trace!(frame = ?frame.id, "starting async computation");
        self.drive(frame);
        result
    }

    pub(crate) fn resume_frame(&self, id: FrameId, outcome: Outcome) {
        let Some(frame) = self.shared.frames.take(id) else {
            tracing::debug!(frame = ?id, "resume for unknown frame");
            return;
        };
        if !frame.slot.resume(outcome) {
            frame.result.reject(JsError::internal(
                "computation resumed while not suspended",
            ));
            return;
        }
        tracing::trace!(frame = ?id, "resuming async computation");
        self.drive(frame);
    }

    fn drive(&self, mut frame: Frame) {
        let mut cx = Context::from_waker(Waker::noop());
        match frame.body.as_mut().poll(&mut cx) {
            Poll::Ready(Ok(resolution)) => frame.result.resolve(resolution),
            Poll::Ready(Err(error)) => frame.result.reject(error),
            Poll::Pending => match frame.slot.take_operand() {
                Some(operand) => {
                    let id = frame.id;
                    self.shared.frames.park(frame);
                    operand.add_reaction(Reaction::Resume { frame: id });
                }
                None => frame.result.reject(JsError::internal(
                    "computation suspended outside a suspend point",
                )),
            },
        }
    }
}
