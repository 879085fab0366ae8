//! Codec dispatch
//!
//! A [`Codec`] picks the framer for a sub-stream and carries the per-codec
//! defaults the rest of the pipeline needs (key frame gating, bitrate hint).

use std::fmt;

use bytes::Bytes;

use super::unit::{mark_last, AccessUnit};
use super::{amr, h264, h265, mpeg4};

/// Media format of a sub-stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// H.264/AVC Annex-B
    H264,
    /// H.265/HEVC Annex-B
    H265,
    /// MPEG-4 Part 2 visual
    Mpeg4Visual,
    /// AAC, one raw frame per chunk
    Aac,
    /// AMR narrowband or wideband with a one byte frame header
    Amr { wideband: bool },
}

/// When a newly attached subscriber may start receiving units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Discard units until a batch containing a key frame arrives
    WaitForKeyFrame,
    /// Deliver from the first unit
    Immediate,
}

impl Codec {
    pub fn is_video(&self) -> bool {
        matches!(self, Codec::H264 | Codec::H265 | Codec::Mpeg4Visual)
    }

    /// Nominal bitrate in kbit/s, used as a starting point for rate control
    pub fn estimated_bitrate_kbps(&self) -> u32 {
        match self {
            Codec::H264 | Codec::H265 | Codec::Mpeg4Visual => 500,
            Codec::Aac => 96,
            Codec::Amr { wideband: false } => 12,
            Codec::Amr { wideband: true } => 24,
        }
    }

    /// Default gating policy for new subscribers
    ///
    /// MPEG-4 configuration travels out of band, so its subscribers start
    /// immediately unless configured otherwise.
    pub fn default_sync_policy(&self) -> SyncPolicy {
        match self {
            Codec::H264 | Codec::H265 => SyncPolicy::WaitForKeyFrame,
            _ => SyncPolicy::Immediate,
        }
    }

    /// Split one raw chunk into access units
    pub fn split(&self, data: &Bytes, start_time: f64) -> Vec<AccessUnit> {
        match self {
            Codec::H264 => h264::split(data, start_time),
            Codec::H265 => h265::split(data, start_time),
            Codec::Mpeg4Visual => mpeg4::split(data, start_time),
            Codec::Amr { wideband } => amr::split(data, start_time, *wideband),
            Codec::Aac => {
                if data.is_empty() {
                    Vec::new()
                } else {
                    mark_last(vec![AccessUnit::new(data.clone(), start_time)])
                }
            }
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::H264 => write!(f, "H264"),
            Codec::H265 => write!(f, "H265"),
            Codec::Mpeg4Visual => write!(f, "MP4V-ES"),
            Codec::Aac => write!(f, "MPEG4-GENERIC"),
            Codec::Amr { wideband: false } => write!(f, "AMR"),
            Codec::Amr { wideband: true } => write!(f, "AMR-WB"),
        }
    }
}
