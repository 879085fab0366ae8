//! Delivery boundary
//!
//! The transport adapts its own framework to [`AccessUnitSink`]; the core
//! never depends on transport types.

use std::time::SystemTime;

use bytes::Bytes;

use crate::rate::TransmissionStats;

/// One unit handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredFrame {
    /// Payload, cut to the sink's maximum frame size if needed
    pub payload: Bytes,
    /// Wall clock presentation time
    pub presentation_time: SystemTime,
    /// Bytes removed by truncation, zero if the unit fit
    pub num_truncated_bytes: usize,
    pub is_key_frame: bool,
    pub is_end_marker: bool,
}

/// Transport side of a subscriber
pub trait AccessUnitSink: Send {
    /// Whether the transport wants another frame now
    fn is_awaiting_data(&self) -> bool;

    /// Largest payload the transport accepts in one frame
    fn max_frame_size(&self) -> usize;

    /// Hand one frame to the transport
    fn deliver(&mut self, frame: DeliveredFrame);

    /// Latest receiver report for this client, if the transport has one
    fn transmission_stats(&self) -> Option<TransmissionStats> {
        None
    }
}
