//! Raw payload source seam
//!
//! The scheduler pulls raw chunks through this trait so it can be driven by
//! [`ChannelManager`](super::ChannelManager) or by any other producer.

use super::key::ChannelKey;
use crate::media::AccessUnit;

/// Non-blocking supplier of raw chunks per channel and sub-stream
///
/// Returned units carry the raw chunk as payload, stamped with the channel
/// and source id they were read from. `None` means nothing is available
/// right now.
pub trait RawPayloadSource: Send + Sync {
    fn get_raw_payload(&self, key: &ChannelKey, source_id: u32) -> Option<AccessUnit>;
}
