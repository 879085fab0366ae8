//! Statistics for subscribers and the scheduler

use std::time::{Duration, Instant};

/// Per-subscriber delivery statistics
#[derive(Debug, Clone)]
pub struct SubscriberStats {
    /// When the subscriber attached
    pub attached_at: Instant,
    /// Access units produced by the framer for this subscriber
    pub units_received: u64,
    /// Units discarded while waiting for a sync point
    pub units_discarded: u64,
    /// Units dropped by backlog overflow eviction
    pub units_evicted: u64,
    /// Units handed across the delivery boundary
    pub units_delivered: u64,
    /// Bytes handed across the delivery boundary
    pub bytes_delivered: u64,
    /// Deliveries that had to be truncated
    pub truncations: u64,
    /// Bytes cut off by truncation
    pub truncated_bytes: u64,
}

impl SubscriberStats {
    pub fn new() -> Self {
        Self {
            attached_at: Instant::now(),
            units_received: 0,
            units_discarded: 0,
            units_evicted: 0,
            units_delivered: 0,
            bytes_delivered: 0,
            truncations: 0,
            truncated_bytes: 0,
        }
    }

    /// Time since the subscriber attached
    pub fn duration(&self) -> Duration {
        self.attached_at.elapsed()
    }

    /// Delivered bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes_delivered * 8) / secs
        } else {
            0
        }
    }
}

impl Default for SubscriberStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler-wide counters
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Completed poll/sweep/yield cycles
    pub cycles: u64,
    /// Raw samples pulled from the data source
    pub samples_polled: u64,
    /// Subsessions marked for teardown by the sweep phase
    pub subsessions_torn_down: u64,
    /// Client statistics passes run
    pub statistics_passes: u64,
}

impl SchedulerStats {
    pub fn new() -> Self {
        Self::default()
    }
}
