//! Time source abstraction.
//!
//! Every expiry in the engine is an absolute UTC epoch second compared
//! against an injected [`Clock`], never against the wall clock directly.

use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

/// A source of the current time in UTC epoch seconds.
pub trait Clock: Send + Sync {
    /// Returns the current time as UTC epoch seconds.
    fn epoch_second(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_second(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

/// Clock that returns a settable instant.
///
/// Useful for hosts that replay requests and for tests exercising expiry.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    /// Creates a clock frozen at `epoch_second`.
    #[must_use]
    pub fn new(epoch_second: i64) -> Self {
        Self {
            now: AtomicI64::new(epoch_second),
        }
    }

    /// Moves the clock to `epoch_second`.
    pub fn set(&self, epoch_second: i64) {
        self.now.store(epoch_second, Ordering::SeqCst);
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn epoch_second(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
