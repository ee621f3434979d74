//! Polling engine
//!
//! - [`terminal`] polls one allocation until it is classified
//! - [`scale`] waits for a fleet to report the target number of ready replicas
//! - [`allocation`] composes a full measured allocation attempt
//!
//! Neither poller backs off on its own. Pacing comes from
//! [`PollSettings::interval`] (zero by default) and from the think time of
//! the virtual user driving it.

pub mod allocation;
pub mod scale;
pub mod terminal;

pub use allocation::Allocator;
pub use scale::ScaleWaitPoller;
pub use terminal::{TerminalOutcome, TerminalPoller};

use crate::clock::Clock;
use std::time::{Duration, Instant};

/// Deadline and pacing shared by both pollers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSettings {
    /// `None` polls until the predicate holds
    pub deadline: Option<Duration>,
    pub interval: Duration,
}

impl PollSettings {
    pub fn new(deadline: Option<Duration>, interval: Duration) -> Self {
        Self { deadline, interval }
    }

    /// Sleep for the configured interval, if any
    pub(crate) async fn pace(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Deadline anchored at the instant a polling loop started
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    started_at: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub(crate) fn new(started_at: Instant, limit: Option<Duration>) -> Self {
        Self { started_at, limit }
    }

    pub(crate) fn elapsed(&self, clock: &dyn Clock) -> Duration {
        clock.now().saturating_duration_since(self.started_at)
    }

    pub(crate) fn expired(&self, clock: &dyn Clock) -> bool {
        self.limit
            .is_some_and(|limit| self.elapsed(clock) >= limit)
    }
}

/// Whole milliseconds, truncated
#[inline]
pub(crate) fn whole_millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
