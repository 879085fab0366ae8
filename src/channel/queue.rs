//! Bounded per-channel queue
//!
//! Decouples the cadence at which producers push raw samples from the
//! cadence at which the scheduler drains them. Both sides are non-blocking:
//! a full queue drops the new unit, an empty queue returns `None`.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::ConfigError;
use crate::media::AccessUnit;

/// Bounded multi-producer, multi-consumer FIFO of access units
#[derive(Debug)]
pub struct ChannelQueue {
    tx: Sender<AccessUnit>,
    rx: Receiver<AccessUnit>,
    capacity: usize,
    dropped: AtomicU64,
}

impl ChannelQueue {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity("channel queue"));
        }
        let (tx, rx) = bounded(capacity);
        Ok(Self {
            tx,
            rx,
            capacity,
            dropped: AtomicU64::new(0),
        })
    }

    /// Append a unit, dropping it if the queue is full
    pub fn try_enqueue(&self, unit: AccessUnit) -> bool {
        match self.tx.try_send(unit) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Pop the oldest unit, if any
    pub fn try_dequeue(&self) -> Option<AccessUnit> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of units rejected because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;

    fn unit(n: u8) -> AccessUnit {
        AccessUnit::new(Bytes::from(vec![n]), n as f64)
    }

    #[test]
    fn test_overflow_reports_failure() {
        let queue = ChannelQueue::new(3).unwrap();

        let results: Vec<bool> = (0..5).map(|n| queue.try_enqueue(unit(n))).collect();
        assert_eq!(results, vec![true, true, true, false, false]);
        assert_eq!(queue.dropped(), 2);
        assert_eq!(queue.len(), 3);

        for n in 0..3 {
            assert_eq!(queue.try_dequeue().unwrap().payload[0], n);
        }
        assert!(queue.try_dequeue().is_none());
    }

    #[test]
    fn test_empty_dequeue() {
        let queue = ChannelQueue::new(1).unwrap();
        assert!(queue.is_empty());
        assert!(queue.try_dequeue().is_none());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(ChannelQueue::new(0).is_err());
    }

    #[test]
    fn test_concurrent_producers() {
        let queue = Arc::new(ChannelQueue::new(1000).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for n in 0..100 {
                        assert!(queue.try_enqueue(unit(n)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 400);
        assert_eq!(queue.dropped(), 0);
    }
}
