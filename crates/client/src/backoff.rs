//! Delay schedule between status polls.
//!
//! Polling runs on a fixed interval by default. When backoff is enabled,
//! consecutive transport failures stretch the delay exponentially up to
//! a ceiling; the next successful fetch snaps it back to the base
//! interval.

use std::time::Duration;

/// How polling reacts to a backend that stops answering.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// When off, failed polls are retried on the regular interval.
    pub enabled: bool,
    /// Longest pause between two polls during an outage.
    pub max_delay: Duration,
    /// Growth of the pause after each failed poll in a row.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Pause to use after another failed poll, given the pause just taken.
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let stretched = current.as_millis() as f64 * config.multiplier;
    config.max_delay.min(Duration::from_millis(stretched as u64))
}

/// Per-session delay state.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    base: Duration,
    current: Duration,
    config: BackoffConfig,
}

impl PollSchedule {
    pub fn new(base: Duration, config: BackoffConfig) -> Self {
        Self {
            base,
            current: base,
            config,
        }
    }

    /// Delay to wait after a successful fetch. Resets any backoff.
    pub fn on_success(&mut self) -> Duration {
        self.current = self.base;
        self.base
    }

    /// Delay currently in effect, without advancing the schedule.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Delay to wait after a transport failure.
    ///
    /// The first failure waits the base interval; each further
    /// consecutive failure waits longer, never below the base.
    pub fn on_transport_error(&mut self) -> Duration {
        let delay = self.current;
        if self.config.enabled {
            self.current = next_delay(self.current, &self.config).max(self.base);
        }
        delay
    }
}
