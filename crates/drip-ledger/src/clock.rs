//! Time sources.

use std::sync::atomic::{AtomicU64, Ordering};

use drip_core::traits::Clock;
use drip_core::types::Timestamp;

/// Wall clock in unix seconds.
///
/// Never reports a value earlier than one it already returned, even if the
/// host clock is stepped backwards.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = chrono::Utc::now().timestamp().max(0) as Timestamp;
        let prev = self.high_water.fetch_max(wall, Ordering::AcqRel);
        prev.max(wall)
    }
}

/// Manually driven clock for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Jump to `t`. Earlier values are ignored so the clock stays monotonic.
    pub fn set(&self, t: Timestamp) {
        self.now.fetch_max(t, Ordering::AcqRel);
    }

    /// Move forward by `secs` and return the new time. Saturates at `u64::MAX`.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let step = |t: Timestamp| t.saturating_add(secs);
        match self.now.fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| Some(step(t))) {
            Ok(prev) | Err(prev) => step(prev),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::Acquire)
    }
}
