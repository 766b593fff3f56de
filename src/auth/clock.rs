//! Wall-clock source for timestamp freshness checks.

use std::time::{SystemTime, UNIX_EPOCH};

/// Time source trait for testability.
pub trait TimeSource: Send + Sync {
    /// Current time as seconds since the unix epoch.
    fn now(&self) -> i64;
}

/// System time implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            // Clock before the epoch; every timestamp will then fail the skew check.
            .unwrap_or(0)
    }
}

/// Time source pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub i64);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_is_after_2020() {
        assert!(SystemTimeSource.now() > 1_577_836_800);
    }

    #[test]
    fn test_fixed_time_source() {
        assert_eq!(FixedTimeSource(42).now(), 42);
    }
}
