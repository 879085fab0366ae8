//! Channel sample stores
//!
//! A store holds the most recent raw payload ingested for one sub-stream.
//! It is written by the scheduler's poll phase and read by subscribers
//! through a borrowed snapshot; there is no history.
//!
//! ```text
//!  raw chunk ──► SampleStore::ingest ──► RawPayloadBuffer(s)
//!                                              │
//!                        current_unit() ◄──────┘  (snapshot, no copy)
//! ```
//!
//! Two variants exist:
//! - [`SingleSampleStore`]: one buffer, reallocated when a chunk outgrows it
//! - [`MultiplexedSampleStore`]: one buffer per sub-stream of a container
//!   payload, each doubling as needed, with a selectable current sub-stream

pub mod buffer;
pub mod multiplexed;
pub mod single;

pub use buffer::RawPayloadBuffer;
pub use multiplexed::MultiplexedSampleStore;
pub use single::SingleSampleStore;

use crate::error::MediaError;

/// Default initial capacity of a store buffer in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

/// Borrowed view of the latest payload in a store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreSnapshot<'a> {
    pub data: &'a [u8],
    pub start_time: f64,
}

/// Latest-payload holder for one sub-stream
pub trait SampleStore: Send {
    /// Copy a raw chunk into the store, replacing the previous payload
    ///
    /// On error the previous payload is kept.
    fn ingest(&mut self, chunk: &[u8], start_time: f64) -> Result<(), MediaError>;

    /// The most recent payload, if anything has been ingested
    fn current_unit(&self) -> Option<StoreSnapshot<'_>>;

    /// Size in bytes of the most recent payload
    fn current_size(&self) -> usize;

    /// Number of sub-streams held
    fn stream_count(&self) -> usize {
        1
    }

    /// Choose the sub-stream returned by `current_unit`
    ///
    /// Returns false if the index is not available.
    fn select_stream(&mut self, index: usize) -> bool {
        index == 0
    }
}
