//! AMR / AMR-WB audio framing
//!
//! Each raw AMR chunk carries one speech frame preceded by a one byte
//! table-of-contents header:
//! ```text
//! +---+---------+---+-----+
//! | P |   FT    | Q | P P |
//! | 1 |    4    | 1 |  2  |
//! +---+---------+---+-----+
//! ```
//! The padding bits (mask `0x83`) must be zero. `FT` indexes the frame size
//! tables below. The header is stripped from the emitted unit.

use bytes::Bytes;

use super::unit::{mark_last, AccessUnit};

/// Frame size in bytes by frame type, AMR narrowband. `None` marks reserved types.
pub const FRAME_SIZE_NARROWBAND: [Option<u16>; 16] = [
    Some(12), Some(13), Some(15), Some(17),
    Some(19), Some(20), Some(26), Some(31),
    Some(5), None, None, None,
    None, None, None, Some(0),
];

/// Frame size in bytes by frame type, AMR wideband
pub const FRAME_SIZE_WIDEBAND: [Option<u16>; 16] = [
    Some(17), Some(23), Some(32), Some(36),
    Some(40), Some(46), Some(50), Some(58),
    Some(60), Some(5), None, None,
    None, None, Some(0), Some(0),
];

const PADDING_MASK: u8 = 0x83;

/// Decoded table-of-contents header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Raw header byte
    pub raw: u8,
    /// Frame type (FT field)
    pub frame_type: u8,
    /// Frame size for this type, `None` for reserved types
    pub frame_size: Option<u16>,
}

impl FrameHeader {
    /// Parse a header byte; `None` if the padding bits are set
    pub fn parse(raw: u8, wideband: bool) -> Option<Self> {
        if raw & PADDING_MASK != 0 {
            return None;
        }
        let frame_type = (raw & 0x78) >> 3;
        let table = if wideband {
            &FRAME_SIZE_WIDEBAND
        } else {
            &FRAME_SIZE_NARROWBAND
        };
        Some(Self {
            raw,
            frame_type,
            frame_size: table[frame_type as usize],
        })
    }

    pub fn is_valid(&self) -> bool {
        self.frame_size.is_some()
    }
}

/// Strip the header from an AMR chunk
///
/// Invalid headers are logged but the frame is still emitted. A chunk with
/// nothing after the header yields no unit.
pub fn split(data: &Bytes, start_time: f64, wideband: bool) -> Vec<AccessUnit> {
    let Some(&raw) = data.first() else {
        return Vec::new();
    };

    match FrameHeader::parse(raw, wideband) {
        None => tracing::warn!(header = raw, "AMR frame header padding bits are not zero"),
        Some(header) if !header.is_valid() => tracing::warn!(
            header = raw,
            frame_type = header.frame_type,
            "AMR frame header has reserved frame type"
        ),
        Some(header) => tracing::trace!(
            frame_type = header.frame_type,
            frame_size = header.frame_size,
            "AMR frame header"
        ),
    }

    if data.len() <= 1 {
        return Vec::new();
    }
    mark_last(vec![AccessUnit::new(data.slice(1..), start_time)])
}
