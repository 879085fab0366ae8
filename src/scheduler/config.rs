//! Scheduler configuration

use std::time::Duration;

/// Configuration for the scheduler loop
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Raw samples pulled per subsession per revolution
    ///
    /// Bounds the work one busy channel can do before the others are served.
    pub max_samples_per_poll: usize,

    /// Poll revolutions over all subsessions per cycle
    pub max_revolutions: usize,

    /// Longest the loop sleeps when a cycle found no data, and the budget
    /// handed to the external event step
    pub max_delay: Duration,

    /// Interval between client statistics passes
    pub stats_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_samples_per_poll: 15,
            max_revolutions: 60,
            max_delay: Duration::from_micros(5),
            stats_interval: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-subsession sample budget per revolution
    pub fn max_samples_per_poll(mut self, max: usize) -> Self {
        self.max_samples_per_poll = max;
        self
    }

    /// Set the number of poll revolutions per cycle
    pub fn max_revolutions(mut self, revolutions: usize) -> Self {
        self.max_revolutions = revolutions;
        self
    }

    /// Set the maximum idle delay
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the client statistics interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }
}
