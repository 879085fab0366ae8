//! Per-client subscriber
//!
//! A subscriber frames the latest raw payload of its subsession, gates it on
//! a sync point, queues it in a private backlog and delivers on demand.
//!
//! ```text
//!                 retrieve()                         deliver_pending()
//!  raw chunk ──► Codec::split ──► gate ──► Backlog ──► AccessUnitSink
//!                                  │
//!              AwaitingSyncPoint ──┴──► Streaming
//!                (discard until a batch carries a key frame)
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use super::backlog::Backlog;
use super::sink::{AccessUnitSink, DeliveredFrame};
use crate::media::{AccessUnit, Codec, SyncPolicy};
use crate::rate::{RateAdaptation, RateController, SwitchDirection};
use crate::stats::SubscriberStats;

/// Gating state of a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// No key frame seen yet; framed units are discarded
    AwaitingSyncPoint,
    /// Units are queued for delivery
    Streaming,
}

/// Wall clock / media clock pairing fixed by the first delivered unit
#[derive(Debug, Clone, Copy)]
struct Epoch {
    wall_clock: SystemTime,
    start_time: f64,
}

impl Epoch {
    /// `None` when the offset cannot be expressed as a wall clock time
    fn presentation_time(&self, start_time: f64) -> Option<SystemTime> {
        let offset = start_time - self.start_time;
        if offset >= 0.0 {
            let delta = Duration::try_from_secs_f64(offset).ok()?;
            self.wall_clock.checked_add(delta)
        } else {
            let delta = Duration::try_from_secs_f64(-offset).ok()?;
            self.wall_clock.checked_sub(delta)
        }
    }
}

/// Consumption state for one client of one subsession
pub struct Subscriber {
    client_id: u64,
    channel_id: u32,
    source_id: u32,
    codec: Codec,
    policy: SyncPolicy,
    state: SubscriberState,
    backlog: Backlog,
    sink: Box<dyn AccessUnitSink>,
    epoch: Option<Epoch>,
    is_actively_delivering: bool,
    rate_adaptation: Option<Box<dyn RateAdaptation>>,
    rate_controller: Option<Arc<dyn RateController>>,
    last_packet_num_received: Option<u32>,
    stats: SubscriberStats,
}

impl Subscriber {
    pub fn new(
        client_id: u64,
        codec: Codec,
        policy: SyncPolicy,
        max_backlog: usize,
        sink: Box<dyn AccessUnitSink>,
    ) -> Self {
        let state = match policy {
            SyncPolicy::WaitForKeyFrame => SubscriberState::AwaitingSyncPoint,
            SyncPolicy::Immediate => SubscriberState::Streaming,
        };

        Self {
            client_id,
            channel_id: 0,
            source_id: 0,
            codec,
            policy,
            state,
            backlog: Backlog::new(max_backlog),
            sink,
            epoch: None,
            is_actively_delivering: false,
            rate_adaptation: None,
            rate_controller: None,
            last_packet_num_received: None,
            stats: SubscriberStats::new(),
        }
    }

    /// Stamp units with the channel and sub-stream they belong to
    pub fn with_origin(mut self, channel_id: u32, source_id: u32) -> Self {
        self.channel_id = channel_id;
        self.source_id = source_id;
        self
    }

    /// Attach a rate adaptation policy and the controller it drives
    pub fn with_rate_adaptation(
        mut self,
        adaptation: Box<dyn RateAdaptation>,
        controller: Option<Arc<dyn RateController>>,
    ) -> Self {
        self.rate_adaptation = Some(adaptation);
        self.rate_controller = controller;
        self
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    pub fn is_waiting_for_sync_point(&self) -> bool {
        self.state == SubscriberState::AwaitingSyncPoint
    }

    /// Whether the last delivery attempt handed out a unit
    pub fn is_actively_delivering(&self) -> bool {
        self.is_actively_delivering
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn stats(&self) -> &SubscriberStats {
        &self.stats
    }

    /// Frame a raw payload and queue the eligible units
    ///
    /// Returns true if anything was added to the backlog.
    pub fn retrieve(&mut self, payload: &Bytes, start_time: f64) -> bool {
        let units: Vec<AccessUnit> = self
            .codec
            .split(payload, start_time)
            .into_iter()
            .map(|unit| unit.with_origin(self.channel_id, self.source_id))
            .collect();
        self.stats.units_received += units.len() as u64;

        if units.is_empty() {
            return false;
        }

        if self.state == SubscriberState::AwaitingSyncPoint {
            if !units.iter().any(|unit| unit.is_key_frame) {
                self.stats.units_discarded += units.len() as u64;
                return false;
            }
            tracing::debug!(
                client_id = self.client_id,
                codec = %self.codec,
                "Sync point found, streaming"
            );
            self.state = SubscriberState::Streaming;
        }

        let evicted = self.backlog.extend(units);
        if evicted > 0 {
            self.stats.units_evicted += evicted as u64;
            tracing::warn!(
                client_id = self.client_id,
                evicted = evicted,
                backlog = self.backlog.len(),
                "Backlog overflow, dropped to next key frame"
            );
            if self.backlog.is_empty() && self.policy == SyncPolicy::WaitForKeyFrame {
                self.state = SubscriberState::AwaitingSyncPoint;
                return false;
            }
        }

        true
    }

    /// Hand units to the sink for as long as it asks for them
    ///
    /// Returns the number of units delivered.
    pub fn deliver_pending(&mut self) -> usize {
        let mut delivered = 0;

        while self.sink.is_awaiting_data() {
            let Some(unit) = self.backlog.pop_front() else {
                self.is_actively_delivering = false;
                break;
            };
            self.is_actively_delivering = true;
            self.deliver(unit);
            delivered += 1;
        }

        delivered
    }

    fn deliver(&mut self, unit: AccessUnit) {
        let presentation_time = self.presentation_time(unit.start_time);

        let max_size = self.sink.max_frame_size();
        let mut payload = unit.payload;
        let mut num_truncated_bytes = 0;
        if payload.len() > max_size {
            num_truncated_bytes = payload.len() - max_size;
            payload.truncate(max_size);
            self.stats.truncations += 1;
            self.stats.truncated_bytes += num_truncated_bytes as u64;
            tracing::warn!(
                client_id = self.client_id,
                max_size = max_size,
                truncated = num_truncated_bytes,
                "Access unit truncated at delivery"
            );
        }

        self.stats.units_delivered += 1;
        self.stats.bytes_delivered += payload.len() as u64;

        self.sink.deliver(DeliveredFrame {
            payload,
            presentation_time,
            num_truncated_bytes,
            is_key_frame: unit.is_key_frame,
            is_end_marker: unit.is_end_marker,
        });
    }

    /// Map a media start time onto the wall clock
    ///
    /// The first finite start time fixes the epoch. A start time that cannot
    /// be mapped starts a new epoch at the current wall clock; a non-finite
    /// one is delivered at the current wall clock and leaves the epoch alone.
    fn presentation_time(&mut self, start_time: f64) -> SystemTime {
        let now = SystemTime::now();
        if !start_time.is_finite() {
            tracing::warn!(
                client_id = self.client_id,
                start_time = start_time,
                "Non-finite start time, using wall clock"
            );
            return now;
        }

        let epoch = self.epoch.get_or_insert(Epoch {
            wall_clock: now,
            start_time,
        });
        if let Some(time) = epoch.presentation_time(start_time) {
            return time;
        }

        tracing::warn!(
            client_id = self.client_id,
            start_time = start_time,
            epoch_start_time = epoch.start_time,
            "Start time out of range, re-establishing epoch"
        );
        self.epoch = Some(Epoch {
            wall_clock: now,
            start_time,
        });
        now
    }

    /// Feed the latest receiver report to the rate adaptation policy
    ///
    /// Reports that do not advance the received packet counter are ignored.
    /// Returns the directive applied, if any.
    pub fn process_receiver_reports(&mut self) -> Option<SwitchDirection> {
        let adaptation = self.rate_adaptation.as_mut()?;
        let stats = self.sink.transmission_stats()?;

        if self.last_packet_num_received == Some(stats.last_packet_num_received) {
            tracing::trace!(client_id = self.client_id, "No new receiver report");
            return None;
        }
        self.last_packet_num_received = Some(stats.last_packet_num_received);

        let direction = adaptation.advise(&stats);
        if let Some(controller) = &self.rate_controller {
            controller.apply_directive(direction);
        }
        if !direction.is_stay() {
            tracing::debug!(
                client_id = self.client_id,
                direction = %direction,
                loss = stats.loss_ratio(),
                "Rate adaptation advice"
            );
        }

        Some(direction)
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("client_id", &self.client_id)
            .field("codec", &self.codec)
            .field("state", &self.state)
            .field("backlog", &self.backlog.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::rate::TransmissionStats;
    use crate::session::test_support::RecordingSink;

    fn annex_b(nals: &[&[u8]]) -> Bytes {
        let mut raw = Vec::new();
        for nal in nals {
            raw.extend_from_slice(&[0, 0, 0, 1]);
            raw.extend_from_slice(nal);
        }
        Bytes::from(raw)
    }

    fn h264_subscriber(sink: &RecordingSink, max_backlog: usize) -> Subscriber {
        Subscriber::new(
            1,
            Codec::H264,
            SyncPolicy::WaitForKeyFrame,
            max_backlog,
            Box::new(sink.clone()),
        )
        .with_origin(3, 0)
    }

    #[test]
    fn test_waits_for_idr() {
        let sink = RecordingSink::paused();
        let mut sub = h264_subscriber(&sink, 100);

        assert!(!sub.retrieve(&annex_b(&[&[0x41, 0x01], &[0x41, 0x02]]), 0.0));
        assert!(sub.is_waiting_for_sync_point());
        assert_eq!(sub.backlog_len(), 0);
        assert_eq!(sub.stats().units_discarded, 2);

        // SPS + PPS + IDR batch triggers the transition and is queued whole
        assert!(sub.retrieve(&annex_b(&[&[0x67, 0xAA], &[0x68, 0xBB], &[0x65, 0xCC]]), 0.04));
        assert_eq!(sub.state(), SubscriberState::Streaming);
        assert_eq!(sub.backlog_len(), 3);

        assert!(sub.retrieve(&annex_b(&[&[0x41, 0x03]]), 0.08));
        assert_eq!(sub.backlog_len(), 4);
    }

    #[test]
    fn test_immediate_policy() {
        let sink = RecordingSink::paused();
        let mut sub = Subscriber::new(
            1,
            Codec::Mpeg4Visual,
            SyncPolicy::Immediate,
            10,
            Box::new(sink.clone()),
        );
        assert_eq!(sub.state(), SubscriberState::Streaming);

        let p_vop = Bytes::from_static(&[0, 0, 1, 0xB6, 0x40, 0x01]);
        assert!(sub.retrieve(&p_vop, 0.0));
        assert_eq!(sub.backlog_len(), 1);
    }

    #[test]
    fn test_delivery_is_demand_driven() {
        let sink = RecordingSink::paused();
        let mut sub = h264_subscriber(&sink, 100);
        sub.retrieve(&annex_b(&[&[0x65, 0x01], &[0x41, 0x02]]), 0.0);

        assert_eq!(sub.deliver_pending(), 0);
        assert!(sink.frames().is_empty());

        sink.set_awaiting(true);
        assert_eq!(sub.deliver_pending(), 2);
        assert!(!sub.is_actively_delivering());
        let frames = sink.frames();
        assert_eq!(&frames[0].payload[..], &[0x65, 0x01]);
        assert!(frames[0].is_key_frame);
        assert!(frames[1].is_end_marker);
    }

    #[test]
    fn test_timestamps_rebased_on_first_delivery() {
        let sink = RecordingSink::awaiting();
        let mut sub = h264_subscriber(&sink, 100);
        sub.retrieve(&annex_b(&[&[0x65, 0x01]]), 1000.0);
        sub.retrieve(&annex_b(&[&[0x41, 0x02]]), 1000.5);
        sub.deliver_pending();

        let frames = sink.frames();
        let gap = frames[1]
            .presentation_time
            .duration_since(frames[0].presentation_time)
            .unwrap();
        assert!((gap.as_secs_f64() - 0.5).abs() < 1e-6);

        let age = SystemTime::now()
            .duration_since(frames[0].presentation_time)
            .unwrap();
        assert!(age < Duration::from_secs(5));
    }

    #[test]
    fn test_out_of_range_start_times_do_not_stop_delivery() {
        let sink = RecordingSink::awaiting();
        let mut sub = Subscriber::new(
            1,
            Codec::Aac,
            SyncPolicy::Immediate,
            10,
            Box::new(sink.clone()),
        );
        let frame = Bytes::from_static(&[0x21, 0x10, 0x04]);

        assert!(sub.retrieve(&frame, 0.0));
        assert!(sub.retrieve(&frame, 1e20));
        assert!(sub.retrieve(&frame, f64::NAN));
        assert!(sub.retrieve(&frame, f64::INFINITY));
        assert!(sub.retrieve(&frame, 0.04));
        assert_eq!(sub.deliver_pending(), 5);

        let frames = sink.frames();
        assert_eq!(frames.len(), 5);
        let recent = SystemTime::now() - Duration::from_secs(5);
        for frame in &frames {
            assert!(frame.presentation_time > recent);
        }
    }

    #[test]
    fn test_bad_start_time_before_first_delivery() {
        let sink = RecordingSink::awaiting();
        let mut sub = Subscriber::new(
            1,
            Codec::Aac,
            SyncPolicy::Immediate,
            10,
            Box::new(sink.clone()),
        );
        let frame = Bytes::from_static(&[0x21, 0x10, 0x04]);

        // NaN never becomes the epoch, so later units still rebase normally
        sub.retrieve(&frame, f64::NAN);
        sub.retrieve(&frame, 10.0);
        sub.retrieve(&frame, 10.5);
        assert_eq!(sub.deliver_pending(), 3);

        let frames = sink.frames();
        let gap = frames[2]
            .presentation_time
            .duration_since(frames[1].presentation_time)
            .unwrap();
        assert!((gap.as_secs_f64() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_truncation_counted() {
        let sink = RecordingSink::awaiting().with_max_frame_size(4);
        let mut sub = h264_subscriber(&sink, 100);
        sub.retrieve(&annex_b(&[&[0x65, 1, 2, 3, 4, 5, 6]]), 0.0);
        sub.deliver_pending();

        let frames = sink.frames();
        assert_eq!(frames[0].payload.len(), 4);
        assert_eq!(frames[0].num_truncated_bytes, 3);
        assert_eq!(sub.stats().truncations, 1);
        assert_eq!(sub.stats().truncated_bytes, 3);
    }

    #[test]
    fn test_overflow_resumes_at_key_frame() {
        let sink = RecordingSink::paused();
        let mut sub = h264_subscriber(&sink, 4);
        sub.retrieve(&annex_b(&[&[0x65, 0], &[0x41, 1], &[0x41, 2]]), 0.0);
        sub.retrieve(&annex_b(&[&[0x65, 3], &[0x41, 4], &[0x41, 5]]), 0.1);

        assert_eq!(sub.backlog_len(), 3);
        assert_eq!(sub.stats().units_evicted, 3);

        sink.set_awaiting(true);
        sub.deliver_pending();
        let frames = sink.frames();
        assert!(frames[0].is_key_frame);
        assert_eq!(frames[0].payload[1], 3);
    }

    #[test]
    fn test_overflow_without_key_frame_resyncs() {
        let sink = RecordingSink::paused();
        let mut sub = h264_subscriber(&sink, 2);
        sub.retrieve(&annex_b(&[&[0x65, 0]]), 0.0);
        assert!(!sub.retrieve(&annex_b(&[&[0x41, 1], &[0x41, 2]]), 0.1));

        assert_eq!(sub.backlog_len(), 0);
        assert!(sub.is_waiting_for_sync_point());
        assert!(!sub.retrieve(&annex_b(&[&[0x41, 3]]), 0.2));
        assert!(sub.retrieve(&annex_b(&[&[0x65, 4]]), 0.3));
    }

    struct LossPolicy;

    impl RateAdaptation for LossPolicy {
        fn advise(&mut self, stats: &TransmissionStats) -> SwitchDirection {
            if stats.loss_ratio() > 0.05 {
                SwitchDirection::SwitchDown
            } else {
                SwitchDirection::Stay
            }
        }
    }

    #[derive(Default)]
    struct RecordingController(Mutex<Vec<SwitchDirection>>);

    impl RateController for RecordingController {
        fn apply_directive(&self, direction: SwitchDirection) {
            self.0.lock().unwrap().push(direction);
        }
    }

    #[test]
    fn test_receiver_reports() {
        let sink = RecordingSink::paused();
        let controller = Arc::new(RecordingController::default());
        let mut sub = h264_subscriber(&sink, 10).with_rate_adaptation(
            Box::new(LossPolicy),
            Some(Arc::clone(&controller) as Arc<dyn RateController>),
        );

        // nothing reported yet
        assert_eq!(sub.process_receiver_reports(), None);

        sink.set_stats(TransmissionStats {
            last_packet_num_received: 99,
            first_packet_num_reported: 0,
            total_packets_lost: 20,
            ..Default::default()
        });
        assert_eq!(sub.process_receiver_reports(), Some(SwitchDirection::SwitchDown));
        // same counter, skipped
        assert_eq!(sub.process_receiver_reports(), None);

        assert_eq!(*controller.0.lock().unwrap(), vec![SwitchDirection::SwitchDown]);
    }

    #[test]
    fn test_no_rate_adaptation() {
        let sink = RecordingSink::paused();
        sink.set_stats(TransmissionStats::default());
        let mut sub = h264_subscriber(&sink, 10);
        assert_eq!(sub.process_receiver_reports(), None);
    }
}
