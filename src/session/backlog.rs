//! Per-subscriber delivery backlog
//!
//! Units wait here between framing and delivery. When a slow client lets the
//! backlog grow past its limit, the oldest units are dropped up to the next
//! key frame so delivery resumes at a decodable boundary:
//!
//! ```text
//! before:  [K p p p K p p p K p p]   (over limit)
//! after:           [K p p p K p p]
//! ```

use std::collections::VecDeque;

use crate::media::AccessUnit;

/// Bounded FIFO of access units with key-frame aligned eviction
#[derive(Debug)]
pub struct Backlog {
    /// Unit count above which eviction runs
    max_units: usize,
    units: VecDeque<AccessUnit>,
}

impl Backlog {
    pub fn new(max_units: usize) -> Self {
        Self {
            max_units,
            units: VecDeque::new(),
        }
    }

    /// Append a batch, evicting if the limit is exceeded
    ///
    /// Returns the number of units evicted.
    pub fn extend(&mut self, batch: impl IntoIterator<Item = AccessUnit>) -> usize {
        self.units.extend(batch);
        if self.units.len() > self.max_units {
            self.evict()
        } else {
            0
        }
    }

    /// Drop from the head until the backlog fits and starts at a key frame
    fn evict(&mut self) -> usize {
        let before = self.units.len();

        while self.units.len() > self.max_units {
            self.units.pop_front();
            while self.units.front().is_some_and(|unit| !unit.is_key_frame) {
                self.units.pop_front();
            }
        }

        before - self.units.len()
    }

    pub fn pop_front(&mut self) -> Option<AccessUnit> {
        self.units.pop_front()
    }

    pub fn front(&self) -> Option<&AccessUnit> {
        self.units.front()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
