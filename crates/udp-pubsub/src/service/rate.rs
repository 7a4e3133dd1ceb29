//! Loop pacing

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{PubSubError, Result, Timestamp};
use crate::ports::Clock;

/// Paces a loop body to a target frequency by sleeping the residual period.
///
/// Only the most recent `sleep` instant is kept: an overrun iteration makes
/// the next `sleep` return at once and nothing is caught up afterwards.
pub struct Rate {
    period: Duration,
    clock: Arc<dyn Clock>,
    last: Timestamp,
}

impl Rate {
    /// # Errors
    ///
    /// `Config` unless `hz` is finite and positive.
    pub fn new(hz: f64, clock: Arc<dyn Clock>) -> Result<Self> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(PubSubError::Config(format!("rate must be positive, got {hz} Hz")));
        }
        let period = Duration::try_from_secs_f64(1.0 / hz)
            .map_err(|e| PubSubError::Config(format!("rate {hz} Hz: {e}")))?;
        Self::from_period(period, clock)
    }

    /// # Errors
    ///
    /// `Config` if `period` is zero.
    pub fn from_period(period: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if period.is_zero() {
            return Err(PubSubError::Config("rate period must be non-zero".into()));
        }
        let last = clock.now();
        Ok(Self {
            period,
            clock,
            last,
        })
    }

    /// Block for whatever is left of the period since the previous call.
    pub fn sleep(&mut self) {
        let elapsed = self.clock.now().saturating_duration_since(self.last);
        if elapsed < self.period {
            self.clock.sleep(self.period - elapsed);
        }
        self.last = self.clock.now();
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn frequency_hz(&self) -> f64 {
        1.0 / self.period.as_secs_f64()
    }
}

impl std::fmt::Debug for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rate")
            .field("period", &self.period)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
