//! Channel manager
//!
//! Owns every registered [`MediaChannel`] and is the producer-facing entry
//! point: capture code pushes raw chunks in, the scheduler pulls them out
//! through [`RawPayloadSource`].

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

use super::config::ChannelConfig;
use super::key::ChannelKey;
use super::media_channel::MediaChannel;
use super::source::RawPayloadSource;
use crate::error::ConfigError;
use crate::media::AccessUnit;

/// Concurrent map of channels
///
/// Producers and the scheduler may touch different channels concurrently;
/// `DashMap` shards the map so they rarely contend.
#[derive(Debug, Default)]
pub struct ChannelManager {
    channels: DashMap<ChannelKey, Arc<MediaChannel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a channel
    ///
    /// An existing channel with the same key is replaced; units still queued
    /// on it are dropped with it.
    pub fn create_channel(
        &self,
        key: ChannelKey,
        config: &ChannelConfig,
    ) -> Result<Arc<MediaChannel>, ConfigError> {
        let channel = Arc::new(MediaChannel::new(key.clone(), config)?);

        if self.channels.insert(key.clone(), Arc::clone(&channel)).is_some() {
            tracing::warn!(channel = %key, "Channel replaced");
        } else {
            tracing::info!(
                channel = %key,
                video_source_id = ?config.video_source_id,
                audio_source_id = ?config.audio_source_id,
                "Channel created"
            );
        }

        Ok(channel)
    }

    /// Remove a channel; its queued samples are discarded
    pub fn remove_channel(&self, key: &ChannelKey) -> Option<Arc<MediaChannel>> {
        let removed = self.channels.remove(key).map(|(_, channel)| channel);
        if removed.is_some() {
            tracing::info!(channel = %key, "Channel removed");
        }
        removed
    }

    pub fn channel(&self, key: &ChannelKey) -> Option<Arc<MediaChannel>> {
        self.channels.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Queue raw video chunks; returns how many were accepted
    pub fn add_video_samples<I>(&self, key: &ChannelKey, samples: I) -> usize
    where
        I: IntoIterator<Item = (Bytes, f64)>,
    {
        let Some(channel) = self.channel(key) else {
            tracing::debug!(channel = %key, "Video samples for unknown channel dropped");
            return 0;
        };
        samples
            .into_iter()
            .map(|(payload, start_time)| channel.add_video_sample(payload, start_time))
            .filter(|queued| *queued)
            .count()
    }

    /// Queue raw audio chunks; returns how many were accepted
    pub fn add_audio_samples<I>(&self, key: &ChannelKey, samples: I) -> usize
    where
        I: IntoIterator<Item = (Bytes, f64)>,
    {
        let Some(channel) = self.channel(key) else {
            tracing::debug!(channel = %key, "Audio samples for unknown channel dropped");
            return 0;
        };
        samples
            .into_iter()
            .map(|(payload, start_time)| channel.add_audio_sample(payload, start_time))
            .filter(|queued| *queued)
            .count()
    }
}

impl RawPayloadSource for ChannelManager {
    fn get_raw_payload(&self, key: &ChannelKey, source_id: u32) -> Option<AccessUnit> {
        self.channel(key)?.next_sample(source_id)
    }
}
