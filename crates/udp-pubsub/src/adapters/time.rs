use std::time::{Duration, Instant};

use crate::domain::Timestamp;
use crate::ports::Clock;

// ============================================================================
// SystemClock - Production Monotonic Clock
// ============================================================================

/// Monotonic clock backed by `std::time::Instant`.
///
/// Timestamps count microseconds from the moment the clock was created.
///
/// # Example
///
/// ```rust
/// use udp_pubsub::adapters::SystemClock;
/// use udp_pubsub::Clock;
///
/// let clock = SystemClock::new();
/// let before = clock.now();
/// assert!(clock.now() >= before);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let micros = u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX);
        Timestamp::from_micros(micros)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
