//! Clock abstraction for determinism.

use chrono::{DateTime, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Time left until `deadline`, or zero if it has already passed.
    fn remaining_until(&self, deadline: DateTime<Utc>) -> std::time::Duration {
        (deadline - self.now()).to_std().unwrap_or_default()
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
