//! A channel's video/audio queue pair

use bytes::Bytes;

use super::config::ChannelConfig;
use super::key::ChannelKey;
use super::queue::ChannelQueue;
use crate::error::ConfigError;
use crate::media::AccessUnit;

/// Which half of the queue pair a source id addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Video,
    Audio,
}

/// One logical channel with up to one video and one audio sub-stream
#[derive(Debug)]
pub struct MediaChannel {
    key: ChannelKey,
    video_source_id: Option<u32>,
    audio_source_id: Option<u32>,
    video: ChannelQueue,
    audio: ChannelQueue,
}

impl MediaChannel {
    /// Create a channel, failing if the configuration is inconsistent
    pub fn new(key: ChannelKey, config: &ChannelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            key,
            video_source_id: config.video_source_id,
            audio_source_id: config.audio_source_id,
            video: ChannelQueue::new(config.queue_capacity)?,
            audio: ChannelQueue::new(config.queue_capacity)?,
        })
    }

    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    pub fn video_source_id(&self) -> Option<u32> {
        self.video_source_id
    }

    pub fn audio_source_id(&self) -> Option<u32> {
        self.audio_source_id
    }

    /// Resolve a source id to the video or audio sub-stream
    pub fn source_kind(&self, source_id: u32) -> Option<SourceKind> {
        if self.video_source_id == Some(source_id) {
            Some(SourceKind::Video)
        } else if self.audio_source_id == Some(source_id) {
            Some(SourceKind::Audio)
        } else {
            None
        }
    }

    pub fn queue(&self, kind: SourceKind) -> &ChannelQueue {
        match kind {
            SourceKind::Video => &self.video,
            SourceKind::Audio => &self.audio,
        }
    }

    /// Queue a raw video chunk; false if the channel has no video or the queue is full
    pub fn add_video_sample(&self, payload: Bytes, start_time: f64) -> bool {
        self.add_sample(SourceKind::Video, payload, start_time)
    }

    /// Queue a raw audio chunk; false if the channel has no audio or the queue is full
    pub fn add_audio_sample(&self, payload: Bytes, start_time: f64) -> bool {
        self.add_sample(SourceKind::Audio, payload, start_time)
    }

    fn add_sample(&self, kind: SourceKind, payload: Bytes, start_time: f64) -> bool {
        let source_id = match kind {
            SourceKind::Video => self.video_source_id,
            SourceKind::Audio => self.audio_source_id,
        };
        let Some(source_id) = source_id else {
            return false;
        };

        let unit = AccessUnit::new(payload, start_time).with_origin(self.key.id, source_id);
        let queued = self.queue(kind).try_enqueue(unit);
        if !queued {
            tracing::debug!(
                channel = %self.key,
                source_id = source_id,
                "Channel queue full, sample dropped"
            );
        }
        queued
    }

    /// Pop the oldest raw sample queued for `source_id`
    pub fn next_sample(&self, source_id: u32) -> Option<AccessUnit> {
        let kind = self.source_kind(source_id)?;
        self.queue(kind).try_dequeue()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> MediaChannel {
        let config = ChannelConfig::new()
            .queue_capacity(2)
            .video_source_id(0)
            .audio_source_id(1);
        MediaChannel::new(ChannelKey::new(5, "cam"), &config).unwrap()
    }

    #[test]
    fn test_collision_is_construction_error() {
        let config = ChannelConfig::new().video_source_id(3).audio_source_id(3);
        let err = MediaChannel::new(ChannelKey::new(1, "x"), &config).unwrap_err();
        assert_eq!(err, ConfigError::SourceIdCollision(3));
    }

    #[test]
    fn test_samples_routed_by_source_id() {
        let channel = channel();
        assert!(channel.add_video_sample(Bytes::from_static(&[1]), 0.0));
        assert!(channel.add_audio_sample(Bytes::from_static(&[2]), 0.1));

        let video = channel.next_sample(0).unwrap();
        assert_eq!(&video.payload[..], &[1]);
        assert_eq!(video.channel_id, 5);
        assert_eq!(video.source_id, 0);

        let audio = channel.next_sample(1).unwrap();
        assert_eq!(audio.source_id, 1);
        assert_eq!(audio.start_time, 0.1);

        assert!(channel.next_sample(0).is_none());
        assert!(channel.next_sample(9).is_none());
    }

    #[test]
    fn test_missing_sub_stream() {
        let config = ChannelConfig::new().video_source_id(0);
        let channel = MediaChannel::new(ChannelKey::new(1, "video-only"), &config).unwrap();
        assert!(!channel.add_audio_sample(Bytes::from_static(&[1]), 0.0));
        assert_eq!(channel.source_kind(0), Some(SourceKind::Video));
        assert_eq!(channel.source_kind(1), None);
    }

    #[test]
    fn test_full_queue_drops() {
        let channel = channel();
        assert!(channel.add_video_sample(Bytes::from_static(&[1]), 0.0));
        assert!(channel.add_video_sample(Bytes::from_static(&[2]), 0.0));
        assert!(!channel.add_video_sample(Bytes::from_static(&[3]), 0.0));
        assert_eq!(channel.queue(SourceKind::Video).dropped(), 1);
    }
}
