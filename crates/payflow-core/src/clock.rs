//! Wall-clock port. Payment timestamps and cache expiry both read time
//! through it.

use chrono::{DateTime, Utc};

/// Abstraction over system time so aggregates and caches can be tested
/// against a fixed instant.
pub trait Clock: Send + Sync {
    /// Returns the current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic_enough_for_timestamps() {
        let clock = SystemClock;

        let earlier = clock.now();
        let later = clock.now();

        assert!(later >= earlier);
    }
}
