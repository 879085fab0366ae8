//! Single-stream sample store

use super::buffer::RawPayloadBuffer;
use super::{SampleStore, StoreSnapshot, DEFAULT_BUFFER_SIZE};
use crate::error::MediaError;
use crate::media::nal;

/// Annex-B start code inserted by [`SingleSampleStore::with_start_code`]
pub const ANNEX_B_START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Holds the latest payload of one sub-stream in a single buffer
///
/// The buffer is replaced by one sized exactly to the chunk when a chunk
/// exceeds the current capacity; it never shrinks.
#[derive(Debug)]
pub struct SingleSampleStore {
    buffer: RawPayloadBuffer,
    start_time: f64,
    has_payload: bool,
    /// Start code written in front of chunks that arrive without one
    start_code: Option<&'static [u8]>,
}

impl SingleSampleStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: RawPayloadBuffer::new(0, capacity, 0),
            start_time: 0.0,
            has_payload: false,
            start_code: None,
        }
    }

    /// Insert an Annex-B start code in front of chunks that lack one
    ///
    /// Some capture devices emit bare NAL units. Head room is reserved in
    /// the buffer so the start code is written without moving the chunk.
    pub fn with_start_code(mut self) -> Self {
        let capacity = self.capacity();
        self.start_code = Some(&ANNEX_B_START_CODE);
        self.buffer = RawPayloadBuffer::new(ANNEX_B_START_CODE.len(), capacity, 0);
        self
    }

    /// Largest chunk that fits without reallocating
    pub fn capacity(&self) -> usize {
        self.buffer.total_capacity() - self.head_room()
    }

    fn head_room(&self) -> usize {
        self.start_code.map_or(0, <[u8]>::len)
    }
}

impl Default for SingleSampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore for SingleSampleStore {
    fn ingest(&mut self, chunk: &[u8], start_time: f64) -> Result<(), MediaError> {
        let head_room = self.head_room();

        if chunk.len() > self.capacity() {
            tracing::debug!(
                old_capacity = self.capacity(),
                new_capacity = chunk.len(),
                "Reallocating sample buffer"
            );
            self.buffer = RawPayloadBuffer::new(head_room, chunk.len(), 0);
        }

        // Cannot fail: capacity was checked above.
        self.buffer.fill(chunk, head_room);

        if let Some(start_code) = self.start_code {
            if !chunk.is_empty() && nal::start_code_len(chunk, 0).is_none() {
                self.buffer.prepend(start_code);
            }
        }

        self.start_time = start_time;
        self.has_payload = true;
        Ok(())
    }

    fn current_unit(&self) -> Option<StoreSnapshot<'_>> {
        self.has_payload.then(|| StoreSnapshot {
            data: self.buffer.as_slice(),
            start_time: self.start_time,
        })
    }

    fn current_size(&self) -> usize {
        if self.has_payload {
            self.buffer.len()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = SingleSampleStore::new();
        assert!(store.current_unit().is_none());
        assert_eq!(store.current_size(), 0);
        assert_eq!(store.capacity(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_ingest_within_capacity() {
        let mut store = SingleSampleStore::with_capacity(16);
        store.ingest(&[1, 2, 3], 0.5).unwrap();

        let snapshot = store.current_unit().unwrap();
        assert_eq!(snapshot.data, &[1, 2, 3]);
        assert_eq!(snapshot.start_time, 0.5);
        assert_eq!(store.capacity(), 16);

        store.ingest(&[4], 1.0).unwrap();
        assert_eq!(store.current_unit().unwrap().data, &[4]);
        assert_eq!(store.current_size(), 1);
    }

    #[test]
    fn test_grows_to_chunk_size() {
        let mut store = SingleSampleStore::with_capacity(100);
        let chunk = vec![0xAB; 200];
        store.ingest(&chunk, 2.0).unwrap();

        assert!(store.capacity() >= 200);
        assert_eq!(store.current_size(), 200);
        assert_eq!(store.current_unit().unwrap().data, &chunk[..]);

        // never shrinks
        store.ingest(&[1, 2], 3.0).unwrap();
        assert_eq!(store.capacity(), 200);
    }

    #[test]
    fn test_start_code_inserted() {
        let mut store = SingleSampleStore::with_capacity(8).with_start_code();
        store.ingest(&[0x65, 0x88], 0.0).unwrap();
        assert_eq!(store.current_unit().unwrap().data, &[0, 0, 0, 1, 0x65, 0x88]);

        store.ingest(&[0, 0, 1, 0x41, 0x9A], 0.0).unwrap();
        assert_eq!(store.current_unit().unwrap().data, &[0, 0, 1, 0x41, 0x9A]);

        let big = [0x41u8; 20];
        store.ingest(&big, 0.0).unwrap();
        assert_eq!(store.current_size(), 24);
        assert_eq!(&store.current_unit().unwrap().data[..4], &ANNEX_B_START_CODE);
    }
}
