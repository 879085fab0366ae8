//! Channel configuration

use crate::error::ConfigError;

/// Default number of raw samples a per-channel queue can hold
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_240;

/// Configuration for one media channel
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Capacity of each of the video and audio queues
    pub queue_capacity: usize,

    /// Source id of the video sub-stream, if the channel carries video
    pub video_source_id: Option<u32>,

    /// Source id of the audio sub-stream, if the channel carries audio
    pub audio_source_id: Option<u32>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            video_source_id: None,
            audio_source_id: None,
        }
    }
}

impl ChannelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity of each queue
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the video source id
    pub fn video_source_id(mut self, id: u32) -> Self {
        self.video_source_id = Some(id);
        self
    }

    /// Set the audio source id
    pub fn audio_source_id(mut self, id: u32) -> Self {
        self.audio_source_id = Some(id);
        self
    }

    /// Check construction-time invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("channel queue"));
        }
        match (self.video_source_id, self.audio_source_id) {
            (Some(video), Some(audio)) if video == audio => {
                Err(ConfigError::SourceIdCollision(video))
            }
            _ => Ok(()),
        }
    }
}
