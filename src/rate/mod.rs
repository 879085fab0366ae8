//! Rate adaptation hooks
//!
//! Receiver reports from the transport are turned into [`TransmissionStats`]
//! and handed to a per-subscriber [`RateAdaptation`] policy. The policy's
//! [`SwitchDirection`] is then applied to a shared [`RateController`],
//! typically the encoder driving the channel.
//!
//! The policies and controllers themselves live outside this crate.

use std::fmt;

/// Bitrate change requested by a rate adaptation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchDirection {
    /// Keep the current rate
    #[default]
    Stay,
    /// One step down
    SwitchDown,
    /// One step up
    SwitchUp,
    /// Several steps down
    SwitchDownMultiple,
    /// Several steps up
    SwitchUpMultiple,
    /// Straight to the lowest rate
    SwitchDownMin,
    /// Straight to the highest rate
    SwitchUpMax,
}

impl SwitchDirection {
    pub fn is_stay(&self) -> bool {
        matches!(self, SwitchDirection::Stay)
    }
}

impl fmt::Display for SwitchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SwitchDirection::Stay => "stay",
            SwitchDirection::SwitchDown => "down",
            SwitchDirection::SwitchUp => "up",
            SwitchDirection::SwitchDownMultiple => "down-multiple",
            SwitchDirection::SwitchUpMultiple => "up-multiple",
            SwitchDirection::SwitchDownMin => "down-min",
            SwitchDirection::SwitchUpMax => "up-max",
        };
        f.write_str(name)
    }
}

/// Receiver-side statistics for one client, as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransmissionStats {
    /// Highest packet sequence number the receiver has seen
    pub last_packet_num_received: u32,
    /// Sequence number of the first packet covered by reports
    pub first_packet_num_reported: u32,
    /// Cumulative packets lost
    pub total_packets_lost: u32,
    /// Interarrival jitter in timestamp units
    pub jitter: u32,
    /// Middle 32 bits of the last sender report NTP timestamp
    pub last_sr_time: u32,
    /// Delay since last sender report, in 1/65536 s
    pub diff_sr_rr: u32,
    /// Round trip time in seconds
    pub rtt: f64,
}

impl TransmissionStats {
    /// Fraction of packets lost over the reported range
    pub fn loss_ratio(&self) -> f64 {
        let expected = self
            .last_packet_num_received
            .wrapping_sub(self.first_packet_num_reported)
            .wrapping_add(1);
        if expected == 0 {
            return 0.0;
        }
        (self.total_packets_lost as f64 / expected as f64).min(1.0)
    }
}

/// Per-subscriber rate adaptation policy
pub trait RateAdaptation: Send {
    /// Decide how the rate should change given the latest report
    fn advise(&mut self, stats: &TransmissionStats) -> SwitchDirection;
}

/// Shared sink for rate directives
pub trait RateController: Send + Sync {
    fn apply_directive(&self, direction: SwitchDirection);
}

/// Creates one [`RateAdaptation`] per subscriber
pub trait RateAdaptationFactory: Send + Sync {
    fn create(&self) -> Box<dyn RateAdaptation>;
}
