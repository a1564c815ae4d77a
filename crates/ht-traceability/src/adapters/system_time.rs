//! Time Source Adapters
//!
//! `SystemTimeSource` for real runs, `FixedClock` for deterministic tests.

use crate::ports::outbound::TimeSource;
use parking_lot::RwLock;
use shared_types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time source.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn now_nanos(&self) -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    }
}

/// Controllable clock for tests. `now_nanos` folds in a counter so
/// consecutive calls never collide even when the clock stands still.
pub struct FixedClock {
    now: RwLock<Timestamp>,
    ticks: AtomicU64,
}

impl FixedClock {
    /// Clock frozen at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: RwLock::new(now),
            ticks: AtomicU64::new(0),
        }
    }

    /// Move the clock to an absolute time.
    pub fn set(&self, now: Timestamp) {
        *self.now.write() = now;
    }

    /// Advance the clock by whole seconds.
    pub fn advance(&self, secs: u64) {
        *self.now.write() += secs;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.read()
    }

    fn now_nanos(&self) -> u128 {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        u128::from(*self.now.read()) * 1_000_000_000 + u128::from(tick)
    }
}
