//! MPEG-4 Part 2 (visual) framing
//!
//! MPEG-4 visual start codes are four bytes, `00 00 01 xx`:
//!
//! | Code | Meaning                      |
//! |------|------------------------------|
//! | b0   | visual object sequence start |
//! | b1   | visual object sequence end   |
//! | b2   | user data                    |
//! | b3   | group of VOP                 |
//! | b5   | visual object                |
//! | b6   | VOP (one coded picture)      |
//!
//! Units are split at VOP start codes and keep their start code. Header
//! codes that open the chunk (normally the visual object sequence carrying
//! the decoder configuration) stay attached to the first VOP rather than
//! forming a unit of their own.
//!
//! The two most significant bits after a VOP start code are the
//! `vop_coding_type`; `00` is an I-VOP, which is the key frame.

use bytes::Bytes;

use super::unit::{mark_last, AccessUnit};

/// Length of every MPEG-4 visual start code
pub const START_CODE_LEN: usize = 4;

pub const VISUAL_OBJECT_SEQUENCE_START: u8 = 0xB0;
pub const VOP_START: u8 = 0xB6;

const START_CODE_PREFIX: [u8; 3] = [0x00, 0x00, 0x01];

/// Start code value at `pos` if it is one of `b0..=b6`
fn start_code_at(data: &[u8], pos: usize) -> Option<u8> {
    let rest = data.get(pos..pos + START_CODE_LEN)?;
    if rest[..3] == START_CODE_PREFIX
        && (VISUAL_OBJECT_SEQUENCE_START..=VOP_START).contains(&rest[3])
    {
        Some(rest[3])
    } else {
        None
    }
}

fn is_vop_at(data: &[u8], pos: usize) -> bool {
    start_code_at(data, pos) == Some(VOP_START)
}

/// Whether the VOP starting at `pos` is intra coded
///
/// Returns false if no VOP start code is at `pos` or the coding type byte
/// is missing.
pub fn is_key_frame_at(data: &[u8], pos: usize) -> bool {
    if !is_vop_at(data, pos) {
        return false;
    }
    data.get(pos + START_CODE_LEN)
        .is_some_and(|coding| coding & 0xC0 == 0)
}

/// Split a chunk into VOP access units
pub fn split(data: &Bytes, start_time: f64) -> Vec<AccessUnit> {
    if data.is_empty() {
        return Vec::new();
    }
    if data.len() < START_CODE_LEN {
        return mark_last(vec![AccessUnit::new(data.clone(), start_time)]);
    }

    if start_code_at(data, 0).is_none() {
        tracing::warn!(size = data.len(), "MPEG-4 chunk without leading start code dropped");
        return Vec::new();
    }

    let mut units = Vec::new();
    let mut unit_start = 0;
    // Position of the VOP start code that decides the current unit's type.
    let mut vop_pos = if is_vop_at(data, 0) { Some(0) } else { None };
    let mut i = START_CODE_LEN;

    while i + START_CODE_LEN <= data.len() {
        if !is_vop_at(data, i) {
            i += 1;
            continue;
        }

        match vop_pos {
            // first VOP after the configuration headers joins them
            None => vop_pos = Some(i),
            Some(pos) => {
                let is_key_frame = is_key_frame_at(data, pos);
                units.push(
                    AccessUnit::new(data.slice(unit_start..i), start_time).key_frame(is_key_frame),
                );
                unit_start = i;
                vop_pos = Some(i);
            }
        }
        i += START_CODE_LEN;
    }

    let is_key_frame = vop_pos.is_some_and(|pos| is_key_frame_at(data, pos));
    units.push(AccessUnit::new(data.slice(unit_start..), start_time).key_frame(is_key_frame));

    mark_last(units)
}
