//! Ledger Clock
//!
//! The ledger's timestamp is the only time source liveness decisions use.
//! Players never consult their own wall clock to decide a timeout.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Authoritative time source of a ledger.
pub trait LedgerClock: Send + Sync {
    /// Current ledger time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time (what a real ledger node would stamp).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl LedgerClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Start at the given instant.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(start)) }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(DateTime::<Utc>::default())
    }
}

impl LedgerClock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
