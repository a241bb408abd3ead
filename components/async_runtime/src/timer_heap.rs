//! Timer heap: pending timer callbacks ordered by fire time.
//!
//! Entries are ordered by `(fire_at, sequence)`. The sequence number is the
//! insertion order, so timers scheduled for the same instant fire in the
//! order they were registered. Cancellation only flags the entry; the stale
//! heap key is discarded when it reaches the top.

use core_types::JsError;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::fmt;
use std::time::Duration;

/// Intervals never re-arm faster than this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Identifies a scheduled timer. Never reused within one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(u64);

impl TimerId {
    /// The numeric id handed to scripts.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The work a timer does when it fires.
pub enum TimerCallback {
    /// Fires once (`setTimeout`, `setImmediate`)
    Once(Box<dyn FnOnce() -> Result<(), JsError>>),
    /// Fires every period until cancelled (`setInterval`)
    Repeating(Box<dyn FnMut() -> Result<(), JsError>>),
}

impl TimerCallback {
    /// Wraps a one-shot callback.
    pub fn once<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        TimerCallback::Once(Box::new(f))
    }

    /// Wraps a repeating callback.
    pub fn repeating<F>(f: F) -> Self
    where
        F: FnMut() -> Result<(), JsError> + 'static,
    {
        TimerCallback::Repeating(Box::new(f))
    }
}

impl fmt::Debug for TimerCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerCallback::Once(_) => write!(f, "Once(..)"),
            TimerCallback::Repeating(_) => write!(f, "Repeating(..)"),
        }
    }
}

/// A scheduled timer.
#[derive(Debug)]
pub struct TimerEntry {
    id: TimerId,
    delay: Duration,
    fire_at: Duration,
    sequence: u64,
    callback: TimerCallback,
    cancelled: bool,
}

impl TimerEntry {
    /// The timer's id.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Requested delay (the re-arm period for repeating timers).
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Scheduled fire time, relative to the loop clock's origin.
    pub fn fire_at(&self) -> Duration {
        self.fire_at
    }

    /// Insertion sequence number used to break fire-time ties.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// True for `setInterval` timers.
    pub fn is_repeating(&self) -> bool {
        matches!(self.callback, TimerCallback::Repeating(_))
    }

    /// Runs the callback. A repeating entry is handed back for re-arming.
    pub(crate) fn fire(self) -> (Result<(), JsError>, Option<TimerEntry>) {
        let TimerEntry {
            id,
            delay,
            fire_at,
            sequence,
            callback,
            cancelled,
        } = self;
        match callback {
            TimerCallback::Once(f) => (f(), None),
            TimerCallback::Repeating(mut f) => {
                let result = f();
                let entry = TimerEntry {
                    id,
                    delay,
                    fire_at,
                    sequence,
                    callback: TimerCallback::Repeating(f),
                    cancelled,
                };
                (result, Some(entry))
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct HeapKey {
    fire_at: Duration,
    sequence: u64,
    id: TimerId,
}

/// Priority structure of pending timers.
///
/// # Examples
///
/// ```
/// use async_runtime::{TimerCallback, TimerHeap};
/// use std::time::Duration;
///
/// let mut heap = TimerHeap::new();
/// let a = heap.schedule(TimerCallback::once(|| Ok(())), Duration::from_millis(5), Duration::ZERO);
/// let b = heap.schedule(TimerCallback::once(|| Ok(())), Duration::from_millis(5), Duration::ZERO);
///
/// let due = heap.pop_due(Duration::from_millis(5));
/// let ids: Vec<_> = due.iter().map(|e| e.id()).collect();
/// assert_eq!(ids, vec![a, b]);
/// ```
#[derive(Debug, Default)]
pub struct TimerHeap {
    heap: BinaryHeap<Reverse<HeapKey>>,
    entries: HashMap<TimerId, TimerEntry>,
    // popped repeating timers whose callback has not been re-armed yet
    in_flight: HashSet<TimerId>,
    next_id: u64,
    next_sequence: u64,
    live: usize,
}

impl TimerHeap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `callback` to fire `delay` after `now`.
    pub fn schedule(&mut self, callback: TimerCallback, delay: Duration, now: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let delay = match callback {
            TimerCallback::Repeating(_) => delay.max(MIN_INTERVAL),
            TimerCallback::Once(_) => delay,
        };
        self.insert(TimerEntry {
            id,
            delay,
            fire_at: now + delay,
            sequence: 0,
            callback,
            cancelled: false,
        });
        id
    }

    fn insert(&mut self, mut entry: TimerEntry) {
        entry.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Reverse(HeapKey {
            fire_at: entry.fire_at,
            sequence: entry.sequence,
            id: entry.id,
        }));
        self.entries.insert(entry.id, entry);
        self.live += 1;
    }

    /// Marks a timer inert. Returns false for unknown, fired, or already
    /// cancelled ids.
    ///
    /// A repeating timer that is currently firing is cancelled by preventing
    /// its re-arm.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        if let Some(entry) = self.entries.get_mut(&id) {
            if entry.cancelled {
                return false;
            }
            entry.cancelled = true;
            self.live -= 1;
            return true;
        }
        self.in_flight.remove(&id)
    }

    /// Removes and returns every live entry with `fire_at <= now`, ordered by
    /// fire time then insertion sequence.
    pub fn pop_due(&mut self, now: Duration) -> Vec<TimerEntry> {
        std::iter::from_fn(|| self.pop_next_due(now)).collect()
    }

    /// Removes and returns the earliest live entry with `fire_at <= now`.
    ///
    /// The loop pops one entry per macrotask, so a timer cancelled by an
    /// earlier callback of the same instant is never returned.
    pub fn pop_next_due(&mut self, now: Duration) -> Option<TimerEntry> {
        while self
            .heap
            .peek()
            .is_some_and(|Reverse(key)| key.fire_at <= now)
        {
            let Reverse(key) = self.heap.pop()?;
            let Some(entry) = self.take_matching(&key) else {
                continue;
            };
            if entry.cancelled {
                continue;
            }
            self.live -= 1;
            if entry.is_repeating() {
                self.in_flight.insert(entry.id);
            }
            return Some(entry);
        }
        None
    }

    fn take_matching(&mut self, key: &HeapKey) -> Option<TimerEntry> {
        match self.entries.get(&key.id) {
            Some(entry) if entry.sequence == key.sequence => self.entries.remove(&key.id),
            _ => None,
        }
    }

    /// Re-arms a repeating entry after it fired. An entry cancelled in the
    /// meantime is handed back so its callback is dropped by the caller.
    pub(crate) fn rearm(&mut self, mut entry: TimerEntry, now: Duration) -> Option<TimerEntry> {
        if !self.in_flight.remove(&entry.id) {
            return Some(entry);
        }
        entry.fire_at = now + entry.delay;
        self.insert(entry);
        None
    }

    /// Fire time of the earliest live entry. Inert entries at the top are
    /// discarded along the way.
    pub fn next_fire_time(&mut self) -> Option<Duration> {
        while let Some(Reverse(key)) = self.heap.peek() {
            let live = matches!(
                self.entries.get(&key.id),
                Some(entry) if entry.sequence == key.sequence && !entry.cancelled
            );
            if live {
                return Some(key.fire_at);
            }
            if let Some(Reverse(stale)) = self.heap.pop() {
                self.take_matching(&stale);
            }
        }
        None
    }

    /// Number of live (scheduled, not cancelled) timers.
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when no live timer remains.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Removes every entry, live or inert, and returns the live ones.
    pub(crate) fn drain_entries(&mut self) -> Vec<TimerEntry> {
        self.heap.clear();
        self.in_flight.clear();
        self.live = 0;
        self.entries
            .drain()
            .map(|(_, entry)| entry)
            .filter(|entry| !entry.cancelled)
            .collect()
    }
}
