//! Multiplexed sample store
//!
//! Container payloads carry several sub-streams (for example multiple
//! camera views) in one chunk:
//!
//! ```text
//! +-------+-----------+-----------+-----+-----------+-----------+-----
//! | count | len[0]    | len[1]    | ... | stream 0  | stream 1  | ...
//! | u8    | u32 BE    | u32 BE    |     | len[0] B  | len[1] B  |
//! +-------+-----------+-----------+-----+-----------+-----------+-----
//! ```
//!
//! Each sub-stream is copied into its own buffer. One sub-stream is
//! "current" and is what [`SampleStore::current_unit`] returns.

use bytes::Buf;

use super::buffer::RawPayloadBuffer;
use super::{SampleStore, StoreSnapshot, DEFAULT_BUFFER_SIZE};
use crate::error::MediaError;

/// Holds the latest payload of every sub-stream in a multiplexed chunk
#[derive(Debug)]
pub struct MultiplexedSampleStore {
    buffers: Vec<RawPayloadBuffer>,
    start_time: f64,
    has_payload: bool,
    current_stream: usize,
}

impl MultiplexedSampleStore {
    /// Create a store for `channels` sub-streams with the default buffer size
    pub fn new(channels: usize) -> Self {
        Self::with_capacity(channels, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(channels: usize, capacity: usize) -> Self {
        Self {
            buffers: (0..channels)
                .map(|_| RawPayloadBuffer::new(0, capacity, 0))
                .collect(),
            start_time: 0.0,
            has_payload: false,
            current_stream: 0,
        }
    }

    /// Index of the sub-stream returned by `current_unit`
    pub fn current_stream(&self) -> usize {
        self.current_stream
    }

    /// Select the sub-stream returned by `current_unit`
    ///
    /// Out of range indexes are ignored and return false.
    pub fn set_current_stream(&mut self, index: usize) -> bool {
        if index >= self.buffers.len() {
            tracing::warn!(
                index = index,
                streams = self.buffers.len(),
                "Ignoring out of range stream selection"
            );
            return false;
        }
        self.current_stream = index;
        true
    }

    /// Latest payload of one sub-stream
    pub fn buffer_at(&self, index: usize) -> Option<&[u8]> {
        if !self.has_payload {
            return None;
        }
        self.buffers.get(index).map(RawPayloadBuffer::as_slice)
    }

    /// Bytes a sub-stream can hold before its buffer is regrown
    pub fn stream_capacity(&self, index: usize) -> Option<usize> {
        self.buffers.get(index).map(RawPayloadBuffer::total_capacity)
    }

    /// Read the container header, returning the sub-stream lengths
    fn parse_header(&self, mut chunk: &[u8]) -> Result<(Vec<usize>, usize), MediaError> {
        if !chunk.has_remaining() {
            return Err(MediaError::MalformedHeader);
        }
        let declared = chunk.get_u8() as usize;
        if declared != self.buffers.len() {
            return Err(MediaError::StreamCountMismatch {
                declared,
                configured: self.buffers.len(),
            });
        }
        if chunk.remaining() < declared * 4 {
            return Err(MediaError::MalformedHeader);
        }

        let lengths: Vec<usize> = (0..declared).map(|_| chunk.get_u32() as usize).collect();
        let total: usize = lengths.iter().sum();
        if total > chunk.remaining() {
            return Err(MediaError::TruncatedStream {
                declared: total,
                available: chunk.remaining(),
            });
        }

        Ok((lengths, 1 + declared * 4))
    }
}

fn grown_capacity(current: usize, needed: usize) -> usize {
    let mut capacity = current.max(1);
    while capacity < needed {
        capacity *= 2;
    }
    capacity
}

impl SampleStore for MultiplexedSampleStore {
    fn ingest(&mut self, chunk: &[u8], start_time: f64) -> Result<(), MediaError> {
        let (lengths, header_len) = self.parse_header(chunk)?;

        let mut offset = header_len;
        for (index, (buffer, len)) in self.buffers.iter_mut().zip(lengths).enumerate() {
            if len > buffer.total_capacity() {
                let capacity = grown_capacity(buffer.total_capacity(), len);
                tracing::debug!(
                    stream = index,
                    old_capacity = buffer.total_capacity(),
                    new_capacity = capacity,
                    "Growing sub-stream buffer"
                );
                *buffer = RawPayloadBuffer::new(0, capacity, 0);
            }
            buffer.fill(&chunk[offset..offset + len], 0);
            offset += len;
        }

        self.start_time = start_time;
        self.has_payload = true;
        Ok(())
    }

    fn current_unit(&self) -> Option<StoreSnapshot<'_>> {
        let data = self.buffer_at(self.current_stream)?;
        Some(StoreSnapshot {
            data,
            start_time: self.start_time,
        })
    }

    fn current_size(&self) -> usize {
        self.buffer_at(self.current_stream).map_or(0, <[u8]>::len)
    }

    fn stream_count(&self) -> usize {
        self.buffers.len()
    }

    fn select_stream(&mut self, index: usize) -> bool {
        self.set_current_stream(index)
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;

    fn container(streams: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u8(streams.len() as u8);
        for s in streams {
            buf.put_u32(s.len() as u32);
        }
        for s in streams {
            buf.put_slice(s);
        }
        buf.to_vec()
    }

    #[test]
    fn test_demultiplex() {
        let mut store = MultiplexedSampleStore::new(2);
        store
            .ingest(&container(&[&[1, 2, 3], &[9, 8]]), 1.5)
            .unwrap();

        assert_eq!(store.buffer_at(0), Some(&[1u8, 2, 3][..]));
        assert_eq!(store.buffer_at(1), Some(&[9u8, 8][..]));
        assert_eq!(store.buffer_at(2), None);

        let snapshot = store.current_unit().unwrap();
        assert_eq!(snapshot.data, &[1, 2, 3]);
        assert_eq!(snapshot.start_time, 1.5);
    }

    #[test]
    fn test_select_current_stream() {
        let mut store = MultiplexedSampleStore::new(2);
        store.ingest(&container(&[&[1], &[2, 2]]), 0.0).unwrap();

        assert!(store.set_current_stream(1));
        assert_eq!(store.current_unit().unwrap().data, &[2, 2]);
        assert_eq!(store.current_size(), 2);

        assert!(!store.set_current_stream(5));
        assert_eq!(store.current_stream(), 1);
    }

    #[test]
    fn test_stream_count_mismatch_ignored() {
        let mut store = MultiplexedSampleStore::new(2);
        store.ingest(&container(&[&[1], &[2]]), 0.0).unwrap();

        let err = store.ingest(&container(&[&[7], &[7], &[7]]), 1.0).unwrap_err();
        assert_eq!(
            err,
            MediaError::StreamCountMismatch {
                declared: 3,
                configured: 2
            }
        );
        // previous payload kept
        assert_eq!(store.current_unit().unwrap().data, &[1]);
        assert_eq!(store.current_unit().unwrap().start_time, 0.0);
    }

    #[test]
    fn test_malformed_and_truncated() {
        let mut store = MultiplexedSampleStore::new(1);
        assert_eq!(store.ingest(&[], 0.0), Err(MediaError::MalformedHeader));
        assert_eq!(store.ingest(&[1, 0, 0], 0.0), Err(MediaError::MalformedHeader));
        assert_eq!(
            store.ingest(&[1, 0, 0, 0, 9, 1, 2], 0.0),
            Err(MediaError::TruncatedStream {
                declared: 9,
                available: 2
            })
        );
        assert!(store.current_unit().is_none());
    }

    #[test]
    fn test_sub_stream_doubles() {
        let mut store = MultiplexedSampleStore::with_capacity(2, 4);
        let big = vec![5u8; 13];
        store.ingest(&container(&[&big[..], &[1]]), 0.0).unwrap();

        assert_eq!(store.stream_capacity(0), Some(16));
        assert_eq!(store.stream_capacity(1), Some(4));
        assert_eq!(store.buffer_at(0), Some(&big[..]));
    }
}
