//! liveframe: Live media framing and distribution core
//!
//! This library sits between live encoders and a streaming transport:
//! - Per-channel bounded queues of raw encoded chunks
//! - Latest-sample stores, single or multiplexed with stream selection
//! - Framers for H.264, H.265, MPEG-4 visual, AMR and AAC
//! - Per-client delivery gated on key frames, with a bounded backlog
//! - A scheduler that polls sources, feeds subsessions and releases
//!   channels nobody watches any more
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use liveframe::session::{AccessUnitSink, DeliveredFrame};
//! use liveframe::{
//!     ChannelConfig, ChannelKey, ChannelManager, Codec, Scheduler, SchedulerConfig,
//!     Subsession, SubsessionConfig, SubsessionRegistry,
//! };
//!
//! struct PrintSink;
//!
//! impl AccessUnitSink for PrintSink {
//!     fn is_awaiting_data(&self) -> bool {
//!         true
//!     }
//!
//!     fn max_frame_size(&self) -> usize {
//!         100_000
//!     }
//!
//!     fn deliver(&mut self, frame: DeliveredFrame) {
//!         println!("{} bytes, key frame: {}", frame.payload.len(), frame.is_key_frame);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = ChannelKey::new(1, "camera");
//!     let manager = Arc::new(ChannelManager::new());
//!     manager.create_channel(key.clone(), &ChannelConfig::new().video_source_id(0))?;
//!
//!     let registry = Arc::new(SubsessionRegistry::new());
//!     registry
//!         .register(Subsession::new(key.clone(), 0, SubsessionConfig::new(Codec::H264))?)
//!         .await;
//!     registry
//!         .attach_subscriber(&key, 0, 1, "192.0.2.10", Box::new(PrintSink))
//!         .await?;
//!
//!     manager.add_video_samples(&key, [(Bytes::from_static(&[0, 0, 0, 1, 0x65, 0x88]), 0.0)]);
//!
//!     let mut scheduler = Scheduler::new(manager, registry, SchedulerConfig::default());
//!     scheduler
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod media;
pub mod rate;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod store;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use channel::{ChannelConfig, ChannelKey, ChannelManager, RawPayloadSource};
pub use media::{AccessUnit, Codec, SyncPolicy};
pub use scheduler::{Scheduler, SchedulerConfig, SubsessionRegistry};
pub use session::{Subsession, SubsessionConfig};
