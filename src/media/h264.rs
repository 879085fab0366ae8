//! H.264/AVC Annex-B framing
//!
//! Live capture hands us H.264 as an Annex-B byte stream: NAL units separated
//! by `00 00 01` / `00 00 00 01` start codes. Each NAL unit becomes one
//! access unit.
//!
//! NAL unit header (first byte after the start code):
//! ```text
//! +---+-------+-----------+
//! | F |  NRI  |   Type    |
//! | 1 |   2   |     5     |
//! +---+-------+-----------+
//! ```
//!
//! Type 5 (IDR) is the only unit marked as a key frame. SPS (7) and PPS (8)
//! are classified as parameter sets.

use bytes::Bytes;

use super::nal::{split_nal_payloads, MIN_START_CODE_LEN};
use super::unit::{mark_last, AccessUnit};

/// NAL unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    /// Non-IDR slice
    Slice = 1,
    /// Slice data partition A
    SlicePartA = 2,
    /// Slice data partition B
    SlicePartB = 3,
    /// Slice data partition C
    SlicePartC = 4,
    /// IDR slice (keyframe)
    Idr = 5,
    /// Supplemental enhancement information
    Sei = 6,
    /// Sequence parameter set
    Sps = 7,
    /// Picture parameter set
    Pps = 8,
    /// Access unit delimiter
    Aud = 9,
    /// End of sequence
    EndSeq = 10,
    /// End of stream
    EndStream = 11,
    /// Filler data
    Filler = 12,
}

impl NaluType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b & 0x1F {
            1 => Some(NaluType::Slice),
            2 => Some(NaluType::SlicePartA),
            3 => Some(NaluType::SlicePartB),
            4 => Some(NaluType::SlicePartC),
            5 => Some(NaluType::Idr),
            6 => Some(NaluType::Sei),
            7 => Some(NaluType::Sps),
            8 => Some(NaluType::Pps),
            9 => Some(NaluType::Aud),
            10 => Some(NaluType::EndSeq),
            11 => Some(NaluType::EndStream),
            12 => Some(NaluType::Filler),
            _ => None,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, NaluType::Idr)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, NaluType::Sps | NaluType::Pps)
    }
}

/// Classify a NAL payload (start code already stripped)
pub fn classify(payload: &[u8]) -> Option<NaluType> {
    payload.first().copied().and_then(NaluType::from_byte)
}

/// Split an Annex-B chunk into access units
///
/// A chunk shorter than a start code is passed through as one unclassified
/// unit. A chunk that does not open with a start code is dropped.
pub fn split(data: &Bytes, start_time: f64) -> Vec<AccessUnit> {
    if data.is_empty() {
        return Vec::new();
    }
    if data.len() < MIN_START_CODE_LEN {
        return mark_last(vec![AccessUnit::new(data.clone(), start_time)]);
    }

    let Some(payloads) = split_nal_payloads(data) else {
        tracing::warn!(size = data.len(), "H.264 chunk without leading start code dropped");
        return Vec::new();
    };

    let units = payloads
        .into_iter()
        .map(|payload| {
            let is_key_frame = classify(&payload).is_some_and(|t| t.is_keyframe());
            AccessUnit::new(payload, start_time).key_frame(is_key_frame)
        })
        .collect();

    mark_last(units)
}
