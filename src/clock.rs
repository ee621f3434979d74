//! Time sources for latency measurement and metric timestamps

use std::fmt::Debug;
use std::time::Instant;

/// Source of monotonic and wall-clock time.
///
/// Pollers measure elapsed time with [`Clock::now`]; measured events are
/// stamped with [`Clock::unix_timestamp`].
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;

    /// Seconds since the Unix epoch
    fn unix_timestamp(&self) -> i64;
}

/// Real time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
