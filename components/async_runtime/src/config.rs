//! Event loop configuration.

use crate::clock::{Clock, SystemClock, VirtualClock};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Duration;

/// Where the loop reads time from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSource {
    /// Real monotonic time; idle waits sleep the thread.
    #[default]
    System,
    /// Virtual time; idle waits jump to the next deadline.
    Virtual,
}

/// Settings for one [`EventLoop`](crate::EventLoop) instance.
///
/// Every field has a default, so a partial TOML table deserializes:
///
/// ```
/// use async_runtime::{LoopConfig, TimeSource};
///
/// let config = LoopConfig::default().with_time_source(TimeSource::Virtual);
/// assert_eq!(config.time_source, TimeSource::Virtual);
/// assert!(config.report_unhandled_rejections);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Clock used for timers and idle waits
    pub time_source: TimeSource,
    /// Stop the loop this many milliseconds after it starts, leaving
    /// unfired timers unfired
    pub shutdown_after_ms: Option<u64>,
    /// Report rejected deferred values that are dropped unhandled
    pub report_unhandled_rejections: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            time_source: TimeSource::System,
            shutdown_after_ms: None,
            report_unhandled_rejections: true,
        }
    }
}

impl LoopConfig {
    /// Shorthand for a default config on virtual time.
    pub fn virtual_time() -> Self {
        Self::default().with_time_source(TimeSource::Virtual)
    }

    /// Sets the time source.
    pub fn with_time_source(mut self, time_source: TimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    /// Sets the shutdown deadline, measured from loop start.
    pub fn with_shutdown_after(mut self, after: Duration) -> Self {
        self.shutdown_after_ms = Some(after.as_millis() as u64);
        self
    }

    /// The shutdown deadline as a duration, if configured.
    pub fn shutdown_after(&self) -> Option<Duration> {
        self.shutdown_after_ms.map(Duration::from_millis)
    }

    pub(crate) fn build_clock(&self) -> Rc<dyn Clock> {
        match self.time_source {
            TimeSource::System => Rc::new(SystemClock::new()),
            TimeSource::Virtual => Rc::new(VirtualClock::new()),
        }
    }
}
