//! H.265/HEVC Annex-B framing
//!
//! Same start code layout as H.264, but a two byte NAL header:
//! ```text
//! +---+-------------+-----------+-----------+
//! | F |    Type     |  LayerId  |    TID    |
//! | 1 |      6      |     6     |     3     |
//! +---+-------------+-----------+-----------+
//! ```
//!
//! Types 16..=21 (BLA, IDR, CRA) are intra random access points and are
//! marked as key frames. VPS (32), SPS (33) and PPS (34) are parameter sets.

use bytes::Bytes;

use super::nal::{split_nal_payloads, MIN_START_CODE_LEN};
use super::unit::{mark_last, AccessUnit};

const NAL_VPS: u8 = 32;
const NAL_SPS: u8 = 33;
const NAL_PPS: u8 = 34;

/// Coarse HEVC NAL unit classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HevcNalKind {
    /// Video parameter set
    Vps,
    /// Sequence parameter set
    Sps,
    /// Picture parameter set
    Pps,
    /// BLA / IDR / CRA picture, carrying the raw type value
    Irap(u8),
    /// Any other NAL unit type
    Other(u8),
}

impl HevcNalKind {
    pub fn from_byte(b: u8) -> Self {
        let nal_type = (b & 0x7E) >> 1;
        match nal_type {
            NAL_VPS => HevcNalKind::Vps,
            NAL_SPS => HevcNalKind::Sps,
            NAL_PPS => HevcNalKind::Pps,
            t if t > 15 && t < 22 => HevcNalKind::Irap(t),
            t => HevcNalKind::Other(t),
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, HevcNalKind::Irap(_))
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, HevcNalKind::Vps | HevcNalKind::Sps | HevcNalKind::Pps)
    }
}

/// Classify a NAL payload (start code already stripped)
pub fn classify(payload: &[u8]) -> Option<HevcNalKind> {
    payload.first().copied().map(HevcNalKind::from_byte)
}

/// Split an Annex-B chunk into access units
pub fn split(data: &Bytes, start_time: f64) -> Vec<AccessUnit> {
    if data.is_empty() {
        return Vec::new();
    }
    if data.len() < MIN_START_CODE_LEN {
        return mark_last(vec![AccessUnit::new(data.clone(), start_time)]);
    }

    let Some(payloads) = split_nal_payloads(data) else {
        tracing::warn!(size = data.len(), "H.265 chunk without leading start code dropped");
        return Vec::new();
    };

    let units = payloads
        .into_iter()
        .map(|payload| {
            let is_key_frame = classify(&payload).is_some_and(|k| k.is_keyframe());
            AccessUnit::new(payload, start_time).key_frame(is_key_frame)
        })
        .collect();

    mark_last(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(nal_type: u8) -> u8 {
        nal_type << 1
    }

    #[test]
    fn test_classification() {
        assert_eq!(HevcNalKind::from_byte(0x40), HevcNalKind::Vps);
        assert_eq!(HevcNalKind::from_byte(0x42), HevcNalKind::Sps);
        assert_eq!(HevcNalKind::from_byte(0x44), HevcNalKind::Pps);
        assert_eq!(HevcNalKind::from_byte(0x26), HevcNalKind::Irap(19));
        assert_eq!(HevcNalKind::from_byte(0x02), HevcNalKind::Other(1));
        // forbidden bit is ignored
        assert_eq!(HevcNalKind::from_byte(0x80 | 0x40), HevcNalKind::Vps);
    }

    #[test]
    fn test_irap_open_range() {
        for t in 0u8..64 {
            let kind = HevcNalKind::from_byte(header(t));
            assert_eq!(kind.is_keyframe(), t > 15 && t < 22, "type {}", t);
        }
    }

    #[test]
    fn test_split_parameter_sets_and_idr() {
        let data = Bytes::from_static(&[
            0, 0, 0, 1, 0x40, 0x01, 0x0C, //
            0, 0, 0, 1, 0x42, 0x01, 0x01, //
            0, 0, 0, 1, 0x44, 0x01, 0xC1, //
            0, 0, 0, 1, 0x26, 0x01, 0xAF, //
            0, 0, 1, 0x02, 0x01, 0xD0,
        ]);
        let units = split(&data, 4.0);

        assert_eq!(units.len(), 5);
        let kinds: Vec<_> = units.iter().map(|u| classify(&u.payload).unwrap()).collect();
        assert!(kinds[0].is_parameter_set());
        assert!(kinds[1].is_parameter_set());
        assert!(kinds[2].is_parameter_set());
        assert!(units[3].is_key_frame);
        assert!(!units[4].is_key_frame);
        assert_eq!(units.iter().filter(|u| u.is_key_frame).count(), 1);
        assert!(units[4].is_end_marker);
    }

    #[test]
    fn test_empty_and_malformed() {
        assert!(split(&Bytes::new(), 0.0).is_empty());
        assert_eq!(split(&Bytes::from_static(&[0x26]), 0.0).len(), 1);
        assert!(split(&Bytes::from_static(&[0x26, 0x01, 0xAF, 0x00]), 0.0).is_empty());
    }
}
