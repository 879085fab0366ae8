//! Channel-addressed buffering
//!
//! Producers push raw chunks into a [`ChannelManager`]; each channel keeps a
//! bounded queue for its video sub-stream and one for its audio sub-stream.
//!
//! ```text
//!   capture ──► ChannelManager ──► MediaChannel { video: ChannelQueue,
//!                     │                           audio: ChannelQueue }
//!                     │
//!   scheduler ◄── RawPayloadSource::get_raw_payload(key, source_id)
//! ```

pub mod config;
pub mod key;
pub mod manager;
pub mod media_channel;
pub mod queue;
pub mod source;

pub use config::ChannelConfig;
pub use key::ChannelKey;
pub use manager::ChannelManager;
pub use media_channel::{MediaChannel, SourceKind};
pub use queue::ChannelQueue;
pub use source::RawPayloadSource;
