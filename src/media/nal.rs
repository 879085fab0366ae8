//! Annex-B start code scanning
//!
//! H.264 and H.265 elementary streams delimit NAL units with start codes:
//!
//! ```text
//! 00 00 01 <nal> 00 00 01 <nal> 00 00 00 01 <nal> ...
//! ```
//!
//! The four byte form is a three byte start code preceded by a zero byte.
//! When both forms match at the same offset the four byte form wins, so the
//! extra zero never ends up inside the preceding unit.

use bytes::Bytes;

/// Shortest start code (`00 00 01`)
pub const MIN_START_CODE_LEN: usize = 3;

const START_CODE_4: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
const START_CODE_3: [u8; 3] = [0x00, 0x00, 0x01];

/// Length of the start code at `pos`, if one begins there
pub fn start_code_len(data: &[u8], pos: usize) -> Option<usize> {
    let rest = data.get(pos..)?;
    if rest.starts_with(&START_CODE_4) {
        Some(START_CODE_4.len())
    } else if rest.starts_with(&START_CODE_3) {
        Some(START_CODE_3.len())
    } else {
        None
    }
}

/// Split an Annex-B buffer into NAL payloads with start codes removed
///
/// Returns `None` if the buffer does not open with a start code. Empty
/// payloads between back-to-back start codes are skipped. The returned
/// slices share the input allocation.
pub fn split_nal_payloads(data: &Bytes) -> Option<Vec<Bytes>> {
    let mut start = start_code_len(data, 0)?;
    let mut payloads = Vec::new();
    let mut i = start;

    while i + MIN_START_CODE_LEN <= data.len() {
        match start_code_len(data, i) {
            Some(prefix) => {
                if i > start {
                    payloads.push(data.slice(start..i));
                }
                start = i + prefix;
                i = start;
            }
            None => i += 1,
        }
    }

    if start < data.len() {
        payloads.push(data.slice(start..));
    }

    Some(payloads)
}
