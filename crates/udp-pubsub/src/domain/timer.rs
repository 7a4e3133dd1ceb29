//! Periodic timer
//!
//! A timer is serviced by polling. Firing moves `last_fire_time` to the
//! firing instant, so a late poll yields one firing and the schedule
//! re-phases from there. Missed periods are never replayed.

use std::fmt;
use std::time::Duration;

use super::errors::{PubSubError, Result};
use super::value_objects::Timestamp;

/// Callback run on every firing.
pub type TimerCallback = Box<dyn FnMut()>;

/// Timer state machine: `Active` ⇄ `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Active,
    Cancelled,
}

pub struct Timer {
    period: Duration,
    callback: TimerCallback,
    last_fire_time: Timestamp,
    call_count: u64,
    state: TimerState,
}

impl Timer {
    /// Create an active timer armed at `now`; the first firing is one
    /// period later.
    ///
    /// # Errors
    ///
    /// `Config` if `period` is zero.
    pub fn new(period: Duration, callback: impl FnMut() + 'static, now: Timestamp) -> Result<Self> {
        if period.is_zero() {
            return Err(PubSubError::Config("timer period must be non-zero".into()));
        }
        Ok(Self {
            period,
            callback: Box::new(callback),
            last_fire_time: now,
            call_count: 0,
            state: TimerState::Active,
        })
    }

    /// Fire if active and at least one period has elapsed since the last
    /// firing. Returns whether the callback ran.
    pub fn spin_once(&mut self, now: Timestamp) -> bool {
        if self.state == TimerState::Cancelled {
            return false;
        }
        if now.saturating_duration_since(self.last_fire_time) < self.period {
            return false;
        }

        self.last_fire_time = now;
        self.call_count += 1;
        (self.callback)();
        true
    }

    pub fn cancel(&mut self) {
        self.state = TimerState::Cancelled;
    }

    /// Re-activate and re-arm at `now`.
    pub fn resume(&mut self, now: Timestamp) {
        self.state = TimerState::Active;
        self.last_fire_time = now;
    }

    /// Re-arm at `now` without changing the state.
    pub fn reset(&mut self, now: Timestamp) {
        self.last_fire_time = now;
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TimerState::Active
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn frequency_hz(&self) -> f64 {
        1.0 / self.period.as_secs_f64()
    }

    pub fn last_fire_time(&self) -> Timestamp {
        self.last_fire_time
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("period", &self.period)
            .field("last_fire_time", &self.last_fire_time)
            .field("call_count", &self.call_count)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
