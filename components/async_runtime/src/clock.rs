//! Time sources for the event loop.
//!
//! All loop timestamps are offsets from the clock's origin, so timer fire
//! times compare the same way under real and virtual time.

use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

/// A monotonic time source the event loop reads and idles against.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Blocks (or advances time) until `now() >= deadline`.
    fn sleep_until(&self, deadline: Duration);

    /// How long a blocking wait for host completions may last before
    /// `deadline` is reached.
    fn real_wait(&self, deadline: Duration) -> Duration;
}

/// Wall-clock time backed by [`Instant`].
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClock").field("now", &self.now()).finish()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }

    fn real_wait(&self, deadline: Duration) -> Duration {
        deadline.saturating_sub(self.now())
    }
}

/// Deterministic clock: idling jumps straight to the deadline.
///
/// # Examples
///
/// ```
/// use async_runtime::{Clock, VirtualClock};
/// use std::time::Duration;
///
/// let clock = VirtualClock::new();
/// clock.sleep_until(Duration::from_millis(100));
/// assert_eq!(clock.now(), Duration::from_millis(100));
/// ```
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Cell<Duration>,
}

impl VirtualClock {
    /// Creates a virtual clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves virtual time forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep_until(&self, deadline: Duration) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }

    fn real_wait(&self, _deadline: Duration) -> Duration {
        Duration::ZERO
    }
}
