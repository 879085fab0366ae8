//! Subsession configuration

use crate::error::ConfigError;
use crate::media::{Codec, SyncPolicy};
use crate::store::DEFAULT_BUFFER_SIZE;

/// Default number of access units a subscriber may have queued
pub const DEFAULT_MAX_BACKLOG: usize = 1_000;

/// Configuration for one subsession and the subscribers attached to it
#[derive(Debug, Clone)]
pub struct SubsessionConfig {
    /// Media format of the sub-stream
    pub codec: Codec,

    /// Number of sub-streams multiplexed in each raw chunk
    pub total_channels: usize,

    /// Use the multiplexed store even with a single sub-stream, so the
    /// container format and stream selection stay available
    pub switchable: bool,

    /// Backlog size above which a subscriber drops to the next key frame
    pub max_backlog: usize,

    /// Initial capacity of the sample store buffers in bytes
    pub initial_buffer_size: usize,

    /// Gating policy for new subscribers; `None` uses the codec default
    pub sync_policy: Option<SyncPolicy>,

    /// Insert an Annex-B start code in front of chunks that arrive without one
    pub prepend_start_code: bool,
}

impl SubsessionConfig {
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            total_channels: 1,
            switchable: false,
            max_backlog: DEFAULT_MAX_BACKLOG,
            initial_buffer_size: DEFAULT_BUFFER_SIZE,
            sync_policy: None,
            prepend_start_code: false,
        }
    }

    /// Set the number of multiplexed sub-streams
    pub fn total_channels(mut self, channels: usize) -> Self {
        self.total_channels = channels;
        self
    }

    /// Force the multiplexed store
    pub fn switchable(mut self, switchable: bool) -> Self {
        self.switchable = switchable;
        self
    }

    /// Set the maximum subscriber backlog
    pub fn max_backlog(mut self, max: usize) -> Self {
        self.max_backlog = max;
        self
    }

    /// Set the initial store buffer size
    pub fn initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size;
        self
    }

    /// Override the codec's default gating policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.sync_policy = Some(policy);
        self
    }

    /// Insert missing Annex-B start codes on ingest
    pub fn prepend_start_code(mut self, enabled: bool) -> Self {
        self.prepend_start_code = enabled;
        self
    }

    /// Gating policy in effect
    pub fn effective_sync_policy(&self) -> SyncPolicy {
        self.sync_policy
            .unwrap_or_else(|| self.codec.default_sync_policy())
    }

    /// Whether chunks carry a multiplexed container header
    pub fn is_multiplexed(&self) -> bool {
        self.total_channels > 1 || self.switchable
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_channels == 0 {
            return Err(ConfigError::ZeroChannels);
        }
        if self.max_backlog == 0 {
            return Err(ConfigError::ZeroCapacity("subscriber backlog"));
        }
        Ok(())
    }
}
