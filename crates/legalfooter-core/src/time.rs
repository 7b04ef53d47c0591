//! Clock abstraction for signature timestamp checks and health timing.
//!
//! Production code uses `RealClock`. Tests inject `TestClock` to sign events
//! at a fixed time and to move past the signature tolerance window without
//! sleeping.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

/// Clock abstraction for time operations.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant for duration measurements.
    fn now(&self) -> Instant;

    /// Returns the current system time for timestamps.
    fn now_system(&self) -> SystemTime;

    /// Seconds since the unix epoch, saturating at zero for pre-epoch times.
    fn unix_timestamp(&self) -> i64 {
        let secs = self.now_system().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        i64::try_from(secs).unwrap_or(i64::MAX)
    }
}

/// Real clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock instance.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Test clock for deterministic time control.
///
/// Clones share the same time, so a clock handed to the router can be
/// advanced from the test body.
#[derive(Debug, Clone)]
pub struct TestClock {
    /// Elapsed nanoseconds since creation
    elapsed_ns: Arc<AtomicU64>,
    /// System time as nanoseconds since UNIX_EPOCH
    system_ns: Arc<AtomicU64>,
    /// Base instant for monotonic time calculations
    base_instant: Instant,
}

impl TestClock {
    /// Creates a test clock starting at the current time.
    pub fn new() -> Self {
        Self::with_start_time(SystemTime::now())
    }

    /// Creates a test clock starting at a specific time.
    pub fn with_start_time(start: SystemTime) -> Self {
        Self {
            elapsed_ns: Arc::new(AtomicU64::new(0)),
            system_ns: Arc::new(AtomicU64::new(nanos_since_epoch(start))),
            base_instant: Instant::now(),
        }
    }

    /// Creates a test clock at the given unix timestamp in seconds.
    pub fn at_unix(seconds: u64) -> Self {
        Self::with_start_time(UNIX_EPOCH + Duration::from_secs(seconds))
    }

    /// Advances the clock by the specified duration.
    pub fn advance(&self, duration: Duration) {
        let duration_ns = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_ns.fetch_add(duration_ns, Ordering::AcqRel);
        self.system_ns.fetch_add(duration_ns, Ordering::AcqRel);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base_instant + Duration::from_nanos(self.elapsed_ns.load(Ordering::Acquire))
    }

    fn now_system(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.system_ns.load(Ordering::Acquire))
    }
}

fn nanos_since_epoch(time: SystemTime) -> u64 {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(since_epoch.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances() {
        let clock = TestClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(10));

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(10));
    }

    #[test]
    fn unix_timestamp_follows_advance() {
        let clock = TestClock::at_unix(1_700_000_000);
        assert_eq!(clock.unix_timestamp(), 1_700_000_000);

        clock.advance(Duration::from_secs(301));
        assert_eq!(clock.unix_timestamp(), 1_700_000_301);
    }

    #[test]
    fn clones_share_time() {
        let clock = TestClock::at_unix(1_000);
        let shared = clock.clone();

        clock.advance(Duration::from_secs(5));

        assert_eq!(shared.unix_timestamp(), 1_005);
    }

    #[test]
    fn real_clock_is_after_epoch() {
        assert!(RealClock::new().unix_timestamp() > 0);
    }
}
