//! Subsession lifecycle events
//!
//! Emitted on an unbounded channel so the session layer can react to
//! clients joining and leaving, and release channel resources once a
//! subsession has nobody left to serve.

use tokio::sync::mpsc;

use crate::channel::ChannelKey;

/// Lifecycle notification from a subsession
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A client attached to a sub-stream
    ClientJoined {
        channel: ChannelKey,
        source_id: u32,
        client_id: u64,
        /// Remote address as reported by the transport
        client_addr: String,
    },
    /// A client switched to another multiplexed stream
    ClientUpdated {
        channel: ChannelKey,
        source_id: u32,
        client_id: u64,
        stream_index: usize,
    },
    /// A client detached
    ClientLeft {
        channel: ChannelKey,
        source_id: u32,
        client_id: u64,
    },
    /// The sub-stream served clients before and now has none
    ChannelExhausted { channel: ChannelKey, source_id: u32 },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create an event channel
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
