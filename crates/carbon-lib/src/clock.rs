//! Time sources for the pipeline
//!
//! Runtime is measured on a monotonic clock. Wall-clock timestamps for
//! history entries are derived from the start wall time plus monotonic
//! elapsed time, so they never go backwards.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Real monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.base + offset
    }
}

/// Tracks elapsed runtime since the pipeline started
#[derive(Clone)]
pub struct RuntimeTracker {
    clock: Arc<dyn Clock>,
    started_at: Instant,
    started_wall: DateTime<Utc>,
}

impl RuntimeTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self {
            clock,
            started_at,
            started_wall: Utc::now(),
        }
    }

    /// Current instant according to the injected clock
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Elapsed monotonic time since start
    pub fn runtime(&self) -> Duration {
        self.runtime_at(self.clock.now())
    }

    /// Elapsed time at `instant`, zero if it predates the start
    pub fn runtime_at(&self, instant: Instant) -> Duration {
        instant.saturating_duration_since(self.started_at)
    }

    /// Wall-clock timestamp for a monotonic instant
    pub fn wall_time(&self, instant: Instant) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.runtime_at(instant))
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.started_wall + elapsed
    }

    pub fn started_wall(&self) -> DateTime<Utc> {
        self.started_wall
    }
}

impl std::fmt::Debug for RuntimeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeTracker")
            .field("started_at", &self.started_at)
            .field("started_wall", &self.started_wall)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - start, Duration::from_secs(5));
    }

    #[test]
    fn test_runtime_tracks_clock() {
        let clock = ManualClock::new();
        let tracker = RuntimeTracker::new(Arc::new(clock.clone()));
        assert_eq!(tracker.runtime(), Duration::ZERO);

        clock.advance(Duration::from_secs(1800));
        assert_eq!(tracker.runtime(), Duration::from_secs(1800));
    }

    #[test]
    fn test_wall_time_is_monotonic() {
        let clock = ManualClock::new();
        let tracker = RuntimeTracker::new(Arc::new(clock.clone()));

        let first = tracker.wall_time(clock.now());
        clock.advance(Duration::from_millis(250));
        let second = tracker.wall_time(clock.now());

        assert_eq!(first, tracker.started_wall());
        assert_eq!(second - first, chrono::Duration::milliseconds(250));
    }
}
