//! Access units
//!
//! An access unit is the smallest piece of a bitstream that is handed to a
//! subscriber: one NAL unit for H.264/H.265, one VOP (optionally prefixed by
//! its configuration headers) for MPEG-4 visual, one frame for audio.

use bytes::Bytes;

/// Source id used when a channel has no video or audio sub-stream
pub const UNASSIGNED_SOURCE_ID: u32 = u32::MAX;

/// One deliverable unit of media
///
/// Cheap to clone: the payload is a reference-counted `Bytes`, so fanning a
/// unit out to many subscribers never copies media data.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessUnit {
    /// Unit payload with any start code prefix stripped
    pub payload: Bytes,
    /// Presentation start time in seconds
    pub start_time: f64,
    /// Channel the unit belongs to
    pub channel_id: u32,
    /// Logical sub-stream (video or audio) within the channel
    pub source_id: u32,
    /// Whether decoding can start at this unit
    pub is_key_frame: bool,
    /// Whether this is the last unit produced from one raw chunk
    pub is_end_marker: bool,
}

impl AccessUnit {
    /// Create a unit with no channel identity and no flags set
    pub fn new(payload: Bytes, start_time: f64) -> Self {
        Self {
            payload,
            start_time,
            channel_id: 0,
            source_id: UNASSIGNED_SOURCE_ID,
            is_key_frame: false,
            is_end_marker: false,
        }
    }

    /// Set the key frame flag
    pub fn key_frame(mut self, is_key_frame: bool) -> Self {
        self.is_key_frame = is_key_frame;
        self
    }

    /// Set the end marker flag
    pub fn end_marker(mut self, is_end_marker: bool) -> Self {
        self.is_end_marker = is_end_marker;
        self
    }

    /// Stamp the channel and sub-stream this unit was read from
    pub fn with_origin(mut self, channel_id: u32, source_id: u32) -> Self {
        self.channel_id = channel_id;
        self.source_id = source_id;
        self
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Mark the final unit of a batch as the end of its chunk
pub(crate) fn mark_last(mut units: Vec<AccessUnit>) -> Vec<AccessUnit> {
    if let Some(last) = units.last_mut() {
        last.is_end_marker = true;
    }
    units
}
