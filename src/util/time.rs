//! Time utilities for the duel simulation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Milliseconds on a monotonic timeline. Only differences are meaningful.
pub type Millis = u64;

/// Telegraph resolution period
pub const TELEGRAPH_TICK_MS: u64 = 50;
/// Countdown / round timer period
pub const PRESENTATION_TICK_MS: u64 = 1000;

pub fn telegraph_tick() -> Duration {
    Duration::from_millis(TELEGRAPH_TICK_MS)
}

pub fn presentation_tick() -> Duration {
    Duration::from_millis(PRESENTATION_TICK_MS)
}

/// Source of `now` for every timed decision in a match.
///
/// Must be monotonic within a match. Wall-clock time is never required.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Millis;
}

/// Clock backed by `Instant`, counting from its own creation
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }
}

/// Hand-driven clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Millis) -> Millis {
        self.now.fetch_add(by, Ordering::SeqCst) + by
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Process start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize process start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get process uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Whole seconds until `ready_at`, rounded up; 0 once ready
pub fn secs_until(ready_at: Millis, now: Millis) -> u32 {
    if now >= ready_at {
        return 0;
    }
    ((ready_at - now + 999) / 1000) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.advance(50), 150);
        clock.set(10_000);
        assert_eq!(clock.now_ms(), 10_000);
    }

    #[test]
    fn test_secs_until_rounds_up() {
        assert_eq!(secs_until(8_000, 0), 8);
        assert_eq!(secs_until(8_000, 7_001), 1);
        assert_eq!(secs_until(8_000, 8_000), 0);
        assert_eq!(secs_until(8_000, 9_000), 0);
    }
}
